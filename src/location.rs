//! # Location Source
//!
//! Contract for the platform's position provider. Instead of callbacks
//! writing into shared state, a source pushes [`LocationMessage`]s onto a
//! channel owned by the consumer. Every message carries the [`WatchId`] of
//! the subscription it belongs to, so events from a cancelled subscription
//! can be recognized and dropped.
//!
//! [`ScriptedLocationSource`] replays samples on demand and is what the
//! tests and non-GPS hosts drive the tracker with.

use std::fmt;
use std::sync::mpsc::Sender;

use log::debug;

use crate::error::LocationError;
use crate::Sample;

/// Handle of one watch subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch#{}", self.0)
    }
}

/// Something the provider reported.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    /// Answer to a one-shot request
    InitialPosition(Sample),
    /// Continuous watch update
    Position(Sample),
    /// Provider failure; never fatal
    Error(LocationError),
}

/// An event tagged with the subscription it was produced for.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationMessage {
    pub watch_id: WatchId,
    pub event: LocationEvent,
}

/// Platform position provider.
pub trait LocationSource {
    /// Begin continuous delivery of positions and errors onto `sink`.
    fn watch(&mut self, sink: Sender<LocationMessage>) -> WatchId;

    /// Ask for one fix, delivered as [`LocationEvent::InitialPosition`] or
    /// [`LocationEvent::Error`] tagged with `watch_id`. May never resolve.
    fn request_once(&mut self, watch_id: WatchId, sink: Sender<LocationMessage>);

    /// End a watch. Unknown or already cancelled ids are ignored.
    fn cancel(&mut self, watch_id: WatchId);
}

/// A location source driven by hand.
///
/// Watches and one-shot requests are recorded; the `emit_*` and
/// `resolve_*` methods deliver events to them. Cancelling a watch stops
/// further `Position` delivery but leaves its pending one-shot request in
/// place, like a platform fix that resolves after tracking stopped.
#[derive(Debug, Default)]
pub struct ScriptedLocationSource {
    next_id: u64,
    watches: Vec<(WatchId, Sender<LocationMessage>)>,
    pending_once: Vec<(WatchId, Sender<LocationMessage>)>,
}

impl ScriptedLocationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a position to every active watch. Returns how many received it.
    pub fn emit_position(&mut self, sample: Sample) -> usize {
        self.broadcast(LocationEvent::Position(sample))
    }

    /// Deliver each sample in order.
    pub fn replay<I>(&mut self, samples: I) -> usize
    where
        I: IntoIterator<Item = Sample>,
    {
        samples
            .into_iter()
            .map(|s| self.emit_position(s))
            .sum()
    }

    /// Report an error on every active watch.
    pub fn emit_error(&mut self, error: LocationError) -> usize {
        self.broadcast(LocationEvent::Error(error))
    }

    /// Answer every pending one-shot request with `sample`.
    pub fn resolve_initial(&mut self, sample: Sample) -> usize {
        self.answer_pending(LocationEvent::InitialPosition(sample))
    }

    /// Fail every pending one-shot request.
    pub fn fail_initial(&mut self, error: LocationError) -> usize {
        self.answer_pending(LocationEvent::Error(error))
    }

    pub fn active_watches(&self) -> usize {
        self.watches.len()
    }

    pub fn pending_requests(&self) -> usize {
        self.pending_once.len()
    }

    fn broadcast(&mut self, event: LocationEvent) -> usize {
        // Receivers that went away are pruned
        self.watches.retain(|(watch_id, sink)| {
            sink.send(LocationMessage {
                watch_id: *watch_id,
                event: event.clone(),
            })
            .is_ok()
        });
        self.watches.len()
    }

    fn answer_pending(&mut self, event: LocationEvent) -> usize {
        self.pending_once
            .drain(..)
            .filter(|(watch_id, sink)| {
                sink.send(LocationMessage {
                    watch_id: *watch_id,
                    event: event.clone(),
                })
                .is_ok()
            })
            .count()
    }
}

impl LocationSource for ScriptedLocationSource {
    fn watch(&mut self, sink: Sender<LocationMessage>) -> WatchId {
        self.next_id += 1;
        let id = WatchId(self.next_id);
        self.watches.push((id, sink));
        debug!("[Location] {} opened", id);
        id
    }

    fn request_once(&mut self, watch_id: WatchId, sink: Sender<LocationMessage>) {
        self.pending_once.push((watch_id, sink));
    }

    fn cancel(&mut self, watch_id: WatchId) {
        let before = self.watches.len();
        self.watches.retain(|(id, _)| *id != watch_id);
        if self.watches.len() < before {
            debug!("[Location] {} cancelled", watch_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Coordinate;
    use std::sync::mpsc;

    fn sample(t: i64) -> Sample {
        Sample::new(Coordinate::new(1.0, 2.0), t)
    }

    #[test]
    fn test_watch_delivers_tagged_positions() {
        let (tx, rx) = mpsc::channel();
        let mut source = ScriptedLocationSource::new();

        let id = source.watch(tx);
        assert_eq!(source.emit_position(sample(1)), 1);

        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.watch_id, id);
        assert_eq!(msg.event, LocationEvent::Position(sample(1)));
    }

    #[test]
    fn test_cancel_stops_positions_but_not_pending_fix() {
        let (tx, rx) = mpsc::channel();
        let mut source = ScriptedLocationSource::new();

        let id = source.watch(tx.clone());
        source.request_once(id, tx);
        source.cancel(id);
        source.cancel(id);

        assert_eq!(source.emit_position(sample(1)), 0);
        assert_eq!(source.active_watches(), 0);
        assert_eq!(source.pending_requests(), 1);

        assert_eq!(source.resolve_initial(sample(2)), 1);
        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.event, LocationEvent::InitialPosition(sample(2)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_ids_are_distinct() {
        let (tx, _rx) = mpsc::channel();
        let mut source = ScriptedLocationSource::new();
        let a = source.watch(tx.clone());
        let b = source.watch(tx);
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "watch#1");
    }

    #[test]
    fn test_errors_and_dropped_receivers() {
        let (tx, rx) = mpsc::channel();
        let mut source = ScriptedLocationSource::new();
        let id = source.watch(tx.clone());
        source.request_once(id, tx);

        assert_eq!(source.fail_initial(LocationError::PermissionDenied), 1);
        assert_eq!(source.emit_error(LocationError::Timeout), 1);
        assert_eq!(
            rx.try_recv().unwrap().event,
            LocationEvent::Error(LocationError::PermissionDenied)
        );

        drop(rx);
        assert_eq!(source.replay([sample(1), sample(2)]), 0);
        assert_eq!(source.active_watches(), 0);
    }
}
