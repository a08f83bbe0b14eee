//! # Tracking Session
//!
//! The live tracking state machine. A session is either `Idle` or `Active`:
//!
//! ```text
//! Idle --start--> Active --stop--> Idle
//!                  |  ^
//!                  +--+ ingest
//! ```
//!
//! While active, every ingested [`Sample`] is folded into running aggregates
//! (distance, current/max/average speed, elevation gain and loss) and
//! appended to the recorded path. Stopping hands the aggregates to a
//! [`Journey`] and resets the session.
//!
//! Calls that do not fit the current state (ingesting or stopping while idle,
//! starting twice) are ignored rather than reported: they come from benign
//! races such as a location callback arriving just after stop.

use log::{debug, info};

use crate::achievements::{evaluate, AchievementId, AchievementMetrics, AchievementSet};
use crate::geo_utils::{haversine_distance_km, mps_to_kmh, speed_kmh_from_distance_time};
use crate::journey::{build_journey, Journey, JourneyParts, NamedLocation};
use crate::ticker::elapsed_seconds;
use crate::{Coordinate, PathPoint, Sample, TransportMode};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Active,
}

/// What a single ingested sample changed.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    /// Speed derived for this sample (km/h)
    pub speed_kmh: f64,
    /// Distance added by this sample (km)
    pub distance_delta_km: f64,
    /// False when no speed could be read or derived (first sample without a baseline)
    pub counted_in_average: bool,
    /// Metrics the achievement rules were checked against
    pub metrics: AchievementMetrics,
    /// Achievements reached by this sample that were not unlocked before
    pub newly_unlocked: Vec<AchievementId>,
}

/// Read-only view of the session for display.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub transport_mode: TransportMode,
    pub current_speed_kmh: f64,
    pub max_speed_kmh: f64,
    pub avg_speed_kmh: f64,
    pub distance_km: f64,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
    pub elapsed_seconds: u64,
    pub current_location: Option<Coordinate>,
    pub start_location: Option<NamedLocation>,
    pub altitude_m: Option<f64>,
    pub accuracy_m: Option<f64>,
    pub heading_deg: Option<f64>,
    pub point_count: usize,
}

/// The live tracking session.
///
/// Owned by exactly one caller; all mutation goes through `&mut self`, so
/// samples are processed one at a time to completion.
#[derive(Debug, Clone)]
pub struct TrackingSession {
    status: SessionStatus,
    transport_mode: TransportMode,
    started_at_millis: i64,

    // Captured once per session
    start_location: Option<NamedLocation>,

    // Incremental derivation state
    last_sample: Option<Sample>,
    last_altitude_m: Option<f64>,

    // Running aggregates
    current_speed_kmh: f64,
    total_distance_km: f64,
    max_speed_kmh: f64,
    speed_samples: Vec<f64>,
    speed_sum: f64,
    elevation_gain_m: f64,
    elevation_loss_m: f64,
    path: Vec<PathPoint>,
}

impl Default for TrackingSession {
    fn default() -> Self {
        Self::new(TransportMode::default())
    }
}

impl TrackingSession {
    /// Create an idle session for the given transport mode.
    pub fn new(transport_mode: TransportMode) -> Self {
        Self {
            status: SessionStatus::Idle,
            transport_mode,
            started_at_millis: 0,
            start_location: None,
            last_sample: None,
            last_altitude_m: None,
            current_speed_kmh: 0.0,
            total_distance_km: 0.0,
            max_speed_kmh: 0.0,
            speed_samples: Vec::new(),
            speed_sum: 0.0,
            elevation_gain_m: 0.0,
            elevation_loss_m: 0.0,
            path: Vec::new(),
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Begin a session at `now_millis`.
    ///
    /// Returns false (and changes nothing) if a session is already active.
    pub fn start(&mut self, now_millis: i64) -> bool {
        if self.is_active() {
            debug!("[Session] start ignored: already active");
            return false;
        }

        self.reset();
        self.status = SessionStatus::Active;
        self.started_at_millis = now_millis;
        info!(
            "[Session] Started {} session at {}",
            self.transport_mode.id(),
            now_millis
        );
        true
    }

    /// Record the one-shot initial fix for the active session.
    ///
    /// Sets the start location and, if no sample has arrived yet, the
    /// baseline for the first distance/speed derivation. Ignored when idle
    /// (a fix resolving after stop) or when the start location is already set.
    ///
    /// A fix that resolves after watch samples only sets the start location.
    /// The latest sample stays the baseline, so the next sample's distance
    /// and speed are measured from it rather than from the older fix.
    pub fn record_initial_position(&mut self, coordinate: Coordinate, now_millis: i64) -> bool {
        if !self.is_active() {
            debug!("[Session] Initial position dropped: session not active");
            return false;
        }
        if self.start_location.is_some() {
            debug!("[Session] Initial position dropped: start location already set");
            return false;
        }

        self.start_location = Some(NamedLocation::from_coordinate(coordinate));
        if self.last_sample.is_none() {
            self.last_sample = Some(Sample::new(coordinate, now_millis));
        }
        info!(
            "[Session] Start location {}",
            crate::journey::location_name(&coordinate)
        );
        true
    }

    /// Fold one sample into the session.
    ///
    /// Returns `None` without touching any state when the session is idle.
    pub fn ingest(&mut self, sample: Sample, unlocked: &AchievementSet) -> Option<IngestReport> {
        if !self.is_active() {
            debug!("[Session] Sample dropped: session not active");
            return None;
        }

        let distance_delta_km = self
            .last_sample
            .as_ref()
            .map(|last| haversine_distance_km(&last.coordinate, &sample.coordinate))
            .unwrap_or(0.0);

        // Speed: provider reading if present, else derived from the previous sample
        let (raw_speed, counted_in_average) = match (sample.speed_mps, &self.last_sample) {
            (Some(mps), _) => (mps_to_kmh(mps), true),
            (None, Some(last)) => {
                let elapsed_seconds =
                    (sample.timestamp_millis - last.timestamp_millis).max(0) as f64 / 1000.0;
                (
                    speed_kmh_from_distance_time(distance_delta_km, elapsed_seconds),
                    true,
                )
            }
            (None, None) => (0.0, false),
        };
        let speed_kmh = if raw_speed.is_finite() {
            raw_speed.max(0.0)
        } else {
            0.0
        };

        self.current_speed_kmh = speed_kmh;
        self.max_speed_kmh = self.max_speed_kmh.max(speed_kmh);
        self.total_distance_km += distance_delta_km;

        self.path.push(PathPoint {
            coordinate: sample.coordinate,
            timestamp_millis: sample.timestamp_millis,
            speed_kmh,
        });

        if counted_in_average {
            self.speed_samples.push(speed_kmh);
            self.speed_sum += speed_kmh;
        }

        if let Some(altitude) = sample.altitude_m.filter(|a| a.is_finite()) {
            if let Some(previous) = self.last_altitude_m {
                let delta = altitude - previous;
                if delta > 0.0 {
                    self.elevation_gain_m += delta;
                } else {
                    self.elevation_loss_m += delta.abs();
                }
            }
            self.last_altitude_m = Some(altitude);
        }

        self.last_sample = Some(sample);

        let metrics = AchievementMetrics {
            speed_kmh,
            total_distance_km: self.total_distance_km,
            duration_seconds: elapsed_seconds(self.started_at_millis, sample.timestamp_millis),
        };
        let newly_unlocked = evaluate(&metrics, unlocked);

        debug!(
            "[Session] Sample #{}: {:.1} km/h, +{:.4} km (total {:.3} km)",
            self.path.len(),
            speed_kmh,
            distance_delta_km,
            self.total_distance_km
        );

        Some(IngestReport {
            speed_kmh,
            distance_delta_km,
            counted_in_average,
            metrics,
            newly_unlocked,
        })
    }

    /// End the active session at `now_millis`.
    ///
    /// Returns the finished journey when a position was ever recorded and
    /// the start location is known; `None` otherwise, including when the
    /// session was not active. The session is idle and reset afterwards.
    pub fn stop(&mut self, now_millis: i64) -> Option<Journey> {
        if !self.is_active() {
            debug!("[Session] stop ignored: session not active");
            return None;
        }

        self.status = SessionStatus::Idle;

        let journey = match (self.last_sample, self.start_location.take()) {
            (Some(last), Some(start_location)) => {
                let parts = JourneyParts {
                    started_at_millis: self.started_at_millis,
                    start_location,
                    distance_km: self.total_distance_km,
                    max_speed_kmh: self.max_speed_kmh,
                    avg_speed_kmh: self.avg_speed_kmh(),
                    path: std::mem::take(&mut self.path),
                };
                Some(build_journey(
                    parts,
                    now_millis,
                    last.coordinate,
                    self.transport_mode,
                ))
            }
            _ => None,
        };

        match &journey {
            Some(j) => info!(
                "[Session] Stopped: {:.2} km in {}s, {} points",
                j.distance_km,
                j.duration_seconds,
                j.point_count()
            ),
            None => info!("[Session] Stopped without a recorded position, no journey"),
        }

        self.reset();
        journey
    }

    /// Change the transport mode. Only allowed while idle.
    pub fn set_transport_mode(&mut self, mode: TransportMode) -> bool {
        if self.is_active() {
            debug!("[Session] Transport mode change rejected while active");
            return false;
        }
        self.transport_mode = mode;
        true
    }

    fn reset(&mut self) {
        self.started_at_millis = 0;
        self.start_location = None;
        self.last_sample = None;
        self.last_altitude_m = None;
        self.current_speed_kmh = 0.0;
        self.total_distance_km = 0.0;
        self.max_speed_kmh = 0.0;
        self.speed_samples.clear();
        self.speed_sum = 0.0;
        self.elevation_gain_m = 0.0;
        self.elevation_loss_m = 0.0;
        self.path.clear();
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn transport_mode(&self) -> TransportMode {
        self.transport_mode
    }

    /// Start time of the active session.
    pub fn started_at_millis(&self) -> Option<i64> {
        self.is_active().then_some(self.started_at_millis)
    }

    pub fn start_location(&self) -> Option<&NamedLocation> {
        self.start_location.as_ref()
    }

    pub fn last_sample(&self) -> Option<&Sample> {
        self.last_sample.as_ref()
    }

    pub fn current_speed_kmh(&self) -> f64 {
        self.current_speed_kmh
    }

    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_km
    }

    pub fn max_speed_kmh(&self) -> f64 {
        self.max_speed_kmh
    }

    /// Arithmetic mean of the per-sample speeds counted so far.
    pub fn avg_speed_kmh(&self) -> f64 {
        if self.speed_samples.is_empty() {
            0.0
        } else {
            self.speed_sum / self.speed_samples.len() as f64
        }
    }

    pub fn speed_samples(&self) -> &[f64] {
        &self.speed_samples
    }

    pub fn elevation_gain_m(&self) -> f64 {
        self.elevation_gain_m
    }

    pub fn elevation_loss_m(&self) -> f64 {
        self.elevation_loss_m
    }

    pub fn path(&self) -> &[PathPoint] {
        &self.path
    }

    /// Whole seconds since start, or 0 when idle.
    pub fn elapsed_seconds(&self, now_millis: i64) -> u64 {
        match self.started_at_millis() {
            Some(started) => elapsed_seconds(started, now_millis),
            None => 0,
        }
    }

    /// Everything the dashboard shows, derived at `now_millis`.
    pub fn snapshot(&self, now_millis: i64) -> SessionSnapshot {
        let last = self.last_sample.as_ref();
        SessionSnapshot {
            status: self.status,
            transport_mode: self.transport_mode,
            current_speed_kmh: self.current_speed_kmh,
            max_speed_kmh: self.max_speed_kmh,
            avg_speed_kmh: self.avg_speed_kmh(),
            distance_km: self.total_distance_km,
            elevation_gain_m: self.elevation_gain_m,
            elevation_loss_m: self.elevation_loss_m,
            elapsed_seconds: self.elapsed_seconds(now_millis),
            current_location: last.map(|s| s.coordinate),
            start_location: self.start_location.clone(),
            altitude_m: last.and_then(|s| s.altitude_m),
            accuracy_m: last.and_then(|s| s.accuracy_m),
            heading_deg: last.and_then(|s| s.heading_deg),
            point_count: self.path.len(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
