//! # Tracker
//!
//! Application root. Owns one [`TrackingSession`], the journey and
//! achievement stores, and the channel the location source delivers into.
//!
//! ## Flow
//! 1. [`Tracker::start`] opens a watch and a one-shot request on the source
//!    and starts the duration ticker
//! 2. [`Tracker::pump`] drains the channel: positions are folded into the
//!    session, new achievements are persisted, errors are remembered
//! 3. [`Tracker::stop`] processes what is still queued, cancels the watch,
//!    stops the ticker and saves the finished journey
//!
//! Messages tagged with any watch other than the current one are dropped,
//! so a fix that resolves after stop (or after a restart) cannot touch the
//! new session.
//!
//! ## Example
//! ```rust
//! use speedsync::{Coordinate, MemoryBlobStore, Sample, ScriptedLocationSource, Tracker, TrackerConfig};
//!
//! let mut tracker = Tracker::new(TrackerConfig::default(), MemoryBlobStore::new()).unwrap();
//! let mut gps = ScriptedLocationSource::new();
//!
//! tracker.start(0, &mut gps);
//! gps.resolve_initial(Sample::new(Coordinate::new(0.0, 0.0), 0));
//! gps.emit_position(Sample::new(Coordinate::new(0.0, 0.001), 10_000));
//! tracker.pump();
//!
//! let outcome = tracker.stop(10_000, &mut gps);
//! assert!(outcome.is_saved());
//! assert_eq!(tracker.journeys().len(), 1);
//! ```

use std::sync::mpsc::{self, Receiver, Sender};

use log::{debug, error, info, warn};

use crate::achievements::{AchievementId, AchievementSet};
use crate::config::TrackerConfig;
use crate::error::{LocationError, Result, SpeedSyncError};
use crate::history::{AchievementStore, HistoryStats, JourneyStore};
use crate::journey::{Journey, NamedLocation};
use crate::location::{LocationEvent, LocationMessage, LocationSource, WatchId};
use crate::persistence::BlobStore;
use crate::session::{IngestReport, SessionSnapshot, TrackingSession};
use crate::ticker::DurationTicker;
use crate::{init_logging, Coordinate, TransportMode};

/// Something the display should react to, produced by [`Tracker::pump`].
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerUpdate {
    /// The initial fix arrived and became the start location
    StartLocation(NamedLocation),
    /// A position was folded into the session
    Sample {
        report: IngestReport,
        over_speed_limit: bool,
    },
    /// Achievements unlocked for the first time
    AchievementsUnlocked(Vec<AchievementId>),
    /// The provider reported a problem; tracking continues
    LocationError(LocationError),
    /// Duration display refresh
    Tick { elapsed_seconds: u64 },
}

/// Result of [`Tracker::stop`].
#[derive(Debug, Default)]
pub struct StopOutcome {
    /// The finished journey, if the session recorded a position
    pub journey: Option<Journey>,
    /// Updates from events that were still queued at stop
    pub updates: Vec<TrackerUpdate>,
    /// Set when the journey could not be written to the store
    pub save_error: Option<SpeedSyncError>,
}

impl StopOutcome {
    /// True when a journey was produced and written.
    pub fn is_saved(&self) -> bool {
        self.journey.is_some() && self.save_error.is_none()
    }
}

/// Live tracker wiring source, session, evaluator and stores together.
pub struct Tracker<S: BlobStore> {
    config: TrackerConfig,
    session: TrackingSession,

    store: S,
    journeys: JourneyStore,
    achievements: AchievementStore,

    events_tx: Sender<LocationMessage>,
    events_rx: Receiver<LocationMessage>,
    active_watch: Option<WatchId>,

    tick_tx: Sender<u64>,
    tick_rx: Receiver<u64>,
    ticker: Option<DurationTicker>,
    elapsed_seconds: u64,

    last_error: Option<LocationError>,
}

impl<S: BlobStore> Tracker<S> {
    /// Create a tracker, loading history and achievements from `store`.
    pub fn new(config: TrackerConfig, store: S) -> Result<Self> {
        init_logging();
        config.validate()?;

        let journeys = JourneyStore::open(&store, config.journeys_key.as_str());
        let achievements = AchievementStore::open(&store, config.achievements_key.as_str());
        let (events_tx, events_rx) = mpsc::channel();
        let (tick_tx, tick_rx) = mpsc::channel();

        info!(
            "[Tracker] Ready: {} journeys, {} achievements unlocked",
            journeys.len(),
            achievements.unlocked().len()
        );

        Ok(Self {
            session: TrackingSession::new(config.transport_mode),
            config,
            store,
            journeys,
            achievements,
            events_tx,
            events_rx,
            active_watch: None,
            tick_tx,
            tick_rx,
            ticker: None,
            elapsed_seconds: 0,
            last_error: None,
        })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start a session. Returns `false` if one is already running.
    pub fn start<L>(&mut self, now_millis: i64, source: &mut L) -> bool
    where
        L: LocationSource + ?Sized,
    {
        if !self.session.start(now_millis) {
            return false;
        }

        let watch_id = source.watch(self.events_tx.clone());
        source.request_once(watch_id, self.events_tx.clone());
        self.active_watch = Some(watch_id);
        self.last_error = None;
        self.elapsed_seconds = 0;

        let tick_tx = self.tick_tx.clone();
        match DurationTicker::spawn(now_millis, self.config.tick_interval, move |secs| {
            let _ = tick_tx.send(secs);
        }) {
            Ok(ticker) => self.ticker = Some(ticker),
            // Display refresh only; tracking works without it
            Err(e) => error!("[Tracker] Failed to start duration ticker: {}", e),
        }

        info!("[Tracker] Tracking started on {}", watch_id);
        true
    }

    /// Stop the session and save its journey.
    ///
    /// Events already queued from the current watch are processed first and
    /// their updates returned in [`StopOutcome::updates`]. No journey is
    /// produced when idle or when no position was ever recorded, and nothing
    /// is written in that case. If the write fails the journey is still
    /// returned and kept in memory, with the error in
    /// [`StopOutcome::save_error`].
    pub fn stop<L>(&mut self, now_millis: i64, source: &mut L) -> StopOutcome
    where
        L: LocationSource + ?Sized,
    {
        let mut outcome = StopOutcome::default();
        if !self.session.is_active() {
            return outcome;
        }

        while let Ok(message) = self.events_rx.try_recv() {
            self.handle_message(message, &mut outcome.updates);
        }

        if let Some(watch_id) = self.active_watch.take() {
            source.cancel(watch_id);
        }
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
        while self.tick_rx.try_recv().is_ok() {}

        self.elapsed_seconds = 0;

        outcome.journey = self.session.stop(now_millis);
        if let Some(journey) = &outcome.journey {
            if let Err(e) = self.journeys.append(&mut self.store, journey.clone()) {
                outcome.save_error = Some(e);
            }
        }
        outcome
    }

    /// Process everything delivered since the last call.
    pub fn pump(&mut self) -> Vec<TrackerUpdate> {
        let mut updates = Vec::new();

        while let Ok(message) = self.events_rx.try_recv() {
            self.handle_message(message, &mut updates);
        }

        let mut latest_tick = None;
        while let Ok(secs) = self.tick_rx.try_recv() {
            latest_tick = Some(secs);
        }
        if let Some(elapsed_seconds) = latest_tick.filter(|_| self.session.is_active()) {
            self.elapsed_seconds = elapsed_seconds;
            updates.push(TrackerUpdate::Tick { elapsed_seconds });
        }

        updates
    }

    fn handle_message(&mut self, message: LocationMessage, updates: &mut Vec<TrackerUpdate>) {
        if self.active_watch != Some(message.watch_id) {
            debug!("[Tracker] Dropping event from stale {}", message.watch_id);
            return;
        }

        match message.event {
            LocationEvent::InitialPosition(sample) => {
                if self
                    .session
                    .record_initial_position(sample.coordinate, sample.timestamp_millis)
                {
                    if let Some(location) = self.session.start_location() {
                        updates.push(TrackerUpdate::StartLocation(location.clone()));
                    }
                }
            }
            LocationEvent::Position(sample) => {
                let Some(report) = self.session.ingest(sample, self.achievements.unlocked())
                else {
                    return;
                };
                self.last_error = None;

                let over_speed_limit =
                    self.config.speed_alerts && report.speed_kmh > self.config.speed_limit_kmh;
                if over_speed_limit {
                    warn!(
                        "[Tracker] Speed alert: {:.1} km/h over limit of {:.0} km/h",
                        report.speed_kmh, self.config.speed_limit_kmh
                    );
                }

                let unlocked = if report.newly_unlocked.is_empty() {
                    Vec::new()
                } else {
                    self.unlock(report.newly_unlocked.clone())
                };

                updates.push(TrackerUpdate::Sample {
                    report,
                    over_speed_limit,
                });
                if !unlocked.is_empty() {
                    updates.push(TrackerUpdate::AchievementsUnlocked(unlocked));
                }
            }
            LocationEvent::Error(e) => {
                warn!("[Tracker] Location error: {}", e);
                self.last_error = Some(e);
                updates.push(TrackerUpdate::LocationError(e));
            }
        }
    }

    fn unlock(&mut self, ids: Vec<AchievementId>) -> Vec<AchievementId> {
        match self.achievements.unlock(&mut self.store, ids.iter().copied()) {
            Ok(added) => added,
            // Still unlocked in memory; the next successful write persists it
            Err(_) => ids
                .into_iter()
                .filter(|id| self.achievements.unlocked().contains(*id))
                .collect(),
        }
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Choose the transport mode for the next session. Rejected while tracking.
    pub fn set_transport_mode(&mut self, mode: TransportMode) -> bool {
        if !self.session.set_transport_mode(mode) {
            return false;
        }
        self.config.transport_mode = mode;
        true
    }

    pub fn set_speed_limit(&mut self, limit_kmh: f64, alerts: bool) {
        self.config.speed_limit_kmh = limit_kmh.max(0.0);
        self.config.speed_alerts = alerts;
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Delete every saved journey.
    pub fn clear_history(&mut self) -> Result<()> {
        self.journeys.clear(&mut self.store)
    }

    /// Saved journeys, newest first.
    pub fn journeys(&self) -> &[Journey] {
        self.journeys.journeys()
    }

    /// Simplified paths of the saved journeys for history thumbnails, newest
    /// first, using the configured preview tolerance.
    pub fn journey_previews(&self) -> Vec<Vec<Coordinate>> {
        let tolerance = self.config.preview_tolerance_degrees;
        self.journeys()
            .iter()
            .map(|j| j.preview_path(tolerance))
            .collect()
    }

    pub fn history_stats(&self) -> HistoryStats {
        self.journeys.stats()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    pub fn is_tracking(&self) -> bool {
        self.session.is_active()
    }

    pub fn snapshot(&self, now_millis: i64) -> SessionSnapshot {
        self.session.snapshot(now_millis)
    }

    /// Elapsed seconds as of the last tick.
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn achievements(&self) -> &AchievementSet {
        self.achievements.unlocked()
    }

    /// Most recent location error, cleared by the next good position.
    pub fn last_error(&self) -> Option<LocationError> {
        self.last_error
    }

    pub fn active_watch(&self) -> Option<WatchId> {
        self.active_watch
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(mut self) -> S {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
        self.store
    }
}
