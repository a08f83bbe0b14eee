//! Elapsed-time ticker for the duration display.
//!
//! Runs on its own thread and reports whole seconds since the session
//! started once per interval. Stopping joins the thread, so no tick is
//! delivered after [`DurationTicker::stop`] returns.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use log::debug;

use crate::error::Result;

/// Whole seconds between two epoch-millisecond instants, never negative.
pub fn elapsed_seconds(started_at_millis: i64, now_millis: i64) -> u64 {
    ((now_millis - started_at_millis).max(0) / 1000) as u64
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Handle to a running ticker thread.
#[derive(Debug)]
pub struct DurationTicker {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl DurationTicker {
    /// Start ticking every `interval`, reading the wall clock.
    pub fn spawn<F>(started_at_millis: i64, interval: Duration, on_tick: F) -> Result<Self>
    where
        F: FnMut(u64) + Send + 'static,
    {
        Self::spawn_with_clock(started_at_millis, interval, now_millis, on_tick)
    }

    /// Start ticking with a custom clock (epoch milliseconds).
    pub fn spawn_with_clock<F>(
        started_at_millis: i64,
        interval: Duration,
        clock: fn() -> i64,
        mut on_tick: F,
    ) -> Result<Self>
    where
        F: FnMut(u64) + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("speedsync-ticker".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        on_tick(elapsed_seconds(started_at_millis, clock()));
                    }
                    // Stop requested or handle dropped
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        debug!("[Ticker] Started ({:?} interval)", interval);
        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stop ticking and wait for the thread to exit. Idempotent.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            debug!("[Ticker] Stopped");
        }
    }
}

impl Drop for DurationTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
