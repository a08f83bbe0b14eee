//! Tracker configuration.

use std::time::Duration;

use crate::error::{Result, SpeedSyncError};
use crate::TransportMode;

/// Storage key for the journey collection.
pub const DEFAULT_JOURNEYS_KEY: &str = "speedometer-journeys";

/// Storage key for the unlocked achievement ids.
pub const DEFAULT_ACHIEVEMENTS_KEY: &str = "speedometer-achievements";

/// Configuration for a [`Tracker`](crate::Tracker).
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Transport mode used for the next session.
    /// Default: Car
    pub transport_mode: TransportMode,

    /// Speed above which an alert is raised (km/h).
    /// Default: 50.0
    pub speed_limit_kmh: f64,

    /// Whether speed-limit alerts are raised at all.
    /// Default: true
    pub speed_alerts: bool,

    /// Period of the elapsed-time display tick.
    /// Default: 1 second
    pub tick_interval: Duration,

    /// Blob key the journey history is stored under.
    pub journeys_key: String,

    /// Blob key the unlocked achievements are stored under.
    pub achievements_key: String,

    /// Douglas-Peucker tolerance for history preview paths (degrees).
    /// Default: 0.0001 (~11 meters)
    pub preview_tolerance_degrees: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            transport_mode: TransportMode::Car,
            speed_limit_kmh: 50.0,
            speed_alerts: true,
            tick_interval: Duration::from_secs(1),
            journeys_key: DEFAULT_JOURNEYS_KEY.to_string(),
            achievements_key: DEFAULT_ACHIEVEMENTS_KEY.to_string(),
            preview_tolerance_degrees: 0.0001,
        }
    }
}

impl TrackerConfig {
    pub fn with_transport_mode(mut self, mode: TransportMode) -> Self {
        self.transport_mode = mode;
        self
    }

    pub fn with_speed_limit(mut self, limit_kmh: f64, alerts: bool) -> Self {
        self.speed_limit_kmh = limit_kmh;
        self.speed_alerts = alerts;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_preview_tolerance(mut self, tolerance_degrees: f64) -> Self {
        self.preview_tolerance_degrees = tolerance_degrees;
        self
    }

    pub fn with_storage_keys(
        mut self,
        journeys_key: impl Into<String>,
        achievements_key: impl Into<String>,
    ) -> Self {
        self.journeys_key = journeys_key.into();
        self.achievements_key = achievements_key.into();
        self
    }

    /// Check the configuration for values the tracker cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(SpeedSyncError::config("tick interval must be positive"));
        }
        if !self.speed_limit_kmh.is_finite() || self.speed_limit_kmh < 0.0 {
            return Err(SpeedSyncError::config(format!(
                "speed limit must be a non-negative number, got {}",
                self.speed_limit_kmh
            )));
        }
        if self.journeys_key.is_empty() || self.achievements_key.is_empty() {
            return Err(SpeedSyncError::config("storage keys must not be empty"));
        }
        if self.journeys_key == self.achievements_key {
            return Err(SpeedSyncError::config(
                "journeys and achievements must use different storage keys",
            ));
        }
        if !self.preview_tolerance_degrees.is_finite() || self.preview_tolerance_degrees < 0.0 {
            return Err(SpeedSyncError::config(
                "preview tolerance must be a non-negative number",
            ));
        }
        Ok(())
    }
}
