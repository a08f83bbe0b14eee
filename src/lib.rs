//! # SpeedSync
//!
//! Live GPS speed tracking for an on-device speedometer dashboard.
//!
//! This library provides:
//! - An incremental tracking session that folds raw position samples into
//!   distance, speed (current/max/average), elevation and a recorded path
//! - Achievement evaluation against the live session metrics
//! - Journey records and a persisted, newest-first journey history
//! - A duration ticker for elapsed-time display
//!
//! ## Features
//!
//! - **`parallel`** - Compute history statistics with rayon
//! - **`persistence`** - SQLite-backed blob storage
//! - **`http`** - Live weather lookup
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use speedsync::{AchievementSet, Coordinate, Sample, TrackingSession, TransportMode};
//!
//! let mut session = TrackingSession::new(TransportMode::Car);
//! let unlocked = AchievementSet::new();
//!
//! session.start(0);
//! session.record_initial_position(Coordinate::new(0.0, 0.0), 0);
//! session.ingest(Sample::new(Coordinate::new(0.0, 0.0), 0), &unlocked);
//! session.ingest(Sample::new(Coordinate::new(0.0, 0.001), 10_000), &unlocked);
//!
//! let snapshot = session.snapshot(10_000);
//! println!("{:.3} km at {:.1} km/h", snapshot.distance_km, snapshot.current_speed_kmh);
//!
//! let journey = session.stop(10_000);
//! assert!(journey.is_some());
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{LocationError, Result, SpeedSyncError};

// Geographic utilities (distance, speed, bearing)
pub mod geo_utils;
pub use geo_utils::{haversine_distance_km, speed_kmh_from_distance_time};

// Tracker configuration
pub mod config;
pub use config::TrackerConfig;

// Achievement rules and unlocked set
pub mod achievements;
pub use achievements::{
    evaluate, AchievementDef, AchievementId, AchievementMetrics, AchievementProgress,
    AchievementSet,
};

// Journey records
pub mod journey;
pub use journey::{build_journey, Journey, NamedLocation};

// Live tracking session (state machine)
pub mod session;
pub use session::{IngestReport, SessionSnapshot, SessionStatus, TrackingSession};

// Blob persistence backends
pub mod persistence;
#[cfg(feature = "persistence")]
pub use persistence::SqliteBlobStore;
pub use persistence::{BlobStore, FileBlobStore, MemoryBlobStore};

// Journey history and achievement storage
pub mod history;
pub use history::{AchievementStore, HistoryStats, JourneyStore};

// Elapsed-time ticker
pub mod ticker;
pub use ticker::{elapsed_seconds, DurationTicker};

// Location source contract
pub mod location;
pub use location::{
    LocationEvent, LocationMessage, LocationSource, ScriptedLocationSource, WatchId,
};

// Application root: source -> session -> achievements -> stores
pub mod tracker;
pub use tracker::{StopOutcome, Tracker, TrackerUpdate};

// Derived display state
pub mod display;

// Weather collaborator boundary
pub mod weather;
pub use weather::WeatherReport;
#[cfg(feature = "http")]
pub use weather::WeatherClient;

/// Initialize logging for Android hosts.
#[cfg(target_os = "android")]
pub fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("SpeedSync"),
    );
}

#[cfg(not(target_os = "android"))]
pub fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// Serialized with the short `lat`/`lng` keys used by stored journeys.
///
/// # Example
/// ```
/// use speedsync::Coordinate;
/// let point = Coordinate::new(51.5074, -0.1278); // London
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(rename = "lat", alias = "latitude")]
    pub latitude: f64,
    #[serde(rename = "lng", alias = "longitude")]
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the coordinate is finite and within range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// One observation from the location source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub coordinate: Coordinate,
    /// Capture time, epoch milliseconds
    pub timestamp_millis: i64,
    /// Speed reported by the provider (m/s)
    pub speed_mps: Option<f64>,
    /// Horizontal accuracy (meters)
    pub accuracy_m: Option<f64>,
    /// Altitude above sea level (meters)
    pub altitude_m: Option<f64>,
    /// Heading in degrees clockwise from north, [0, 360)
    pub heading_deg: Option<f64>,
}

impl Sample {
    /// Create a sample with only a position and a timestamp.
    pub fn new(coordinate: Coordinate, timestamp_millis: i64) -> Self {
        Self {
            coordinate,
            timestamp_millis,
            speed_mps: None,
            accuracy_m: None,
            altitude_m: None,
            heading_deg: None,
        }
    }

    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }

    pub fn with_altitude(mut self, altitude_m: f64) -> Self {
        self.altitude_m = Some(altitude_m);
        self
    }

    pub fn with_heading(mut self, heading_deg: f64) -> Self {
        self.heading_deg = Some(heading_deg);
        self
    }
}

/// One recorded point of a session's route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    #[serde(flatten)]
    pub coordinate: Coordinate,
    /// Epoch milliseconds
    #[serde(rename = "timestamp")]
    pub timestamp_millis: i64,
    /// Derived speed at this point (km/h, >= 0)
    #[serde(rename = "speed")]
    pub speed_kmh: f64,
}

/// Way of travelling, chosen before a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Walking,
    Running,
    Car,
    Train,
    Flight,
}

impl TransportMode {
    /// Every mode, in display order.
    pub const ALL: [TransportMode; 5] = [
        TransportMode::Walking,
        TransportMode::Running,
        TransportMode::Car,
        TransportMode::Train,
        TransportMode::Flight,
    ];

    /// Stable identifier, as stored in journeys.
    pub fn id(&self) -> &'static str {
        match self {
            TransportMode::Walking => "walking",
            TransportMode::Running => "running",
            TransportMode::Car => "car",
            TransportMode::Train => "train",
            TransportMode::Flight => "flight",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransportMode::Walking => "Walking",
            TransportMode::Running => "Running",
            TransportMode::Car => "Car",
            TransportMode::Train => "Train",
            TransportMode::Flight => "Flight",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            TransportMode::Walking => "🚶",
            TransportMode::Running => "🏃",
            TransportMode::Car => "🚗",
            TransportMode::Train => "🚆",
            TransportMode::Flight => "✈️",
        }
    }

    /// Nominal top speed (km/h). Only used to scale the gauge.
    pub fn max_speed_kmh(&self) -> f64 {
        match self {
            TransportMode::Walking => 8.0,
            TransportMode::Running => 25.0,
            TransportMode::Car => 200.0,
            TransportMode::Train => 300.0,
            TransportMode::Flight => 900.0,
        }
    }

    /// Look up a mode by its identifier.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.id() == id)
    }
}

impl Default for TransportMode {
    fn default() -> Self {
        TransportMode::Car
    }
}

/// Bounding box for a recorded path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from coordinates.
    pub fn from_coordinates<'a, I>(coordinates: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Coordinate>,
    {
        let mut iter = coordinates.into_iter().peekable();
        iter.peek()?;

        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for c in iter {
            min_lat = min_lat.min(c.latitude);
            max_lat = max_lat.max(c.latitude);
            min_lng = min_lng.min(c.longitude);
            max_lng = max_lng.max(c.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(51.5074, -0.1278).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 181.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_coordinate_serializes_short_keys() {
        let json = serde_json::to_string(&Coordinate::new(1.5, 2.5)).unwrap();
        assert_eq!(json, r#"{"lat":1.5,"lng":2.5}"#);

        let parsed: Coordinate = serde_json::from_str(r#"{"latitude":1.5,"longitude":2.5}"#).unwrap();
        assert_eq!(parsed, Coordinate::new(1.5, 2.5));
    }

    #[test]
    fn test_path_point_json_shape() {
        let point = PathPoint {
            coordinate: Coordinate::new(10.0, 20.0),
            timestamp_millis: 1_700_000_000_000,
            speed_kmh: 42.0,
        };
        let value = serde_json::to_value(point).unwrap();
        assert_eq!(value["lat"], 10.0);
        assert_eq!(value["lng"], 20.0);
        assert_eq!(value["timestamp"], 1_700_000_000_000i64);
        assert_eq!(value["speed"], 42.0);
    }

    #[test]
    fn test_transport_mode_ids() {
        for mode in TransportMode::ALL {
            assert_eq!(TransportMode::from_id(mode.id()), Some(mode));
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.id()));
        }
        assert_eq!(TransportMode::from_id("boat"), None);
        assert_eq!(TransportMode::default(), TransportMode::Car);
        assert_eq!(TransportMode::Flight.max_speed_kmh(), 900.0);
    }

    #[test]
    fn test_bounds() {
        let coords = [
            Coordinate::new(51.50, -0.13),
            Coordinate::new(51.52, -0.11),
        ];
        let bounds = Bounds::from_coordinates(&coords).unwrap();
        assert_eq!(bounds.min_lat, 51.50);
        assert_eq!(bounds.max_lng, -0.11);
        let center = bounds.center();
        assert!((center.latitude - 51.51).abs() < 1e-9);

        let empty: [Coordinate; 0] = [];
        assert!(Bounds::from_coordinates(&empty).is_none());
    }
}
