//! Journey records: the immutable result of a completed tracking session.
//!
//! A journey is built exactly once, when a session stops, and is never
//! mutated afterwards. The serialized shape keeps the field names of the
//! stored history so existing blobs keep loading.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use geo::{algorithm::simplify::Simplify, Coord, LineString};
use serde::{Deserialize, Serialize};

use crate::{Bounds, Coordinate, PathPoint, TransportMode};

/// Disambiguates journeys finished within the same millisecond.
static JOURNEY_SEQUENCE: AtomicU32 = AtomicU32::new(0);

/// A coordinate with a human-readable name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedLocation {
    #[serde(flatten)]
    pub coordinate: Coordinate,
    pub name: String,
}

impl NamedLocation {
    /// Name a coordinate with its rounded position.
    pub fn from_coordinate(coordinate: Coordinate) -> Self {
        Self {
            name: location_name(&coordinate),
            coordinate,
        }
    }
}

/// Display name for a coordinate: `"lat, lng"` to four decimals.
pub fn location_name(coordinate: &Coordinate) -> String {
    format!("{:.4}, {:.4}", coordinate.latitude, coordinate.longitude)
}

/// A completed, persisted tracking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journey {
    /// Unique identifier
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub start_location: NamedLocation,
    pub end_location: NamedLocation,
    /// Total distance (km)
    #[serde(rename = "distance")]
    pub distance_km: f64,
    /// Highest derived speed (km/h)
    #[serde(rename = "maxSpeed")]
    pub max_speed_kmh: f64,
    /// Mean of the per-sample speeds (km/h)
    #[serde(rename = "avgSpeed")]
    pub avg_speed_kmh: f64,
    /// Elapsed session time (seconds)
    #[serde(rename = "duration")]
    pub duration_seconds: u64,
    #[serde(rename = "mode")]
    pub transport_mode: TransportMode,
    /// Recorded route, chronological
    pub path: Vec<PathPoint>,
}

/// Aggregates captured from a session at the moment it stops.
#[derive(Debug, Clone, PartialEq)]
pub struct JourneyParts {
    pub started_at_millis: i64,
    pub start_location: NamedLocation,
    pub distance_km: f64,
    pub max_speed_kmh: f64,
    pub avg_speed_kmh: f64,
    pub path: Vec<PathPoint>,
}

/// Assemble a journey from a stopped session's aggregates.
///
/// `now_millis` becomes the end time; duration is whole seconds since the
/// session started, never negative.
pub fn build_journey(
    parts: JourneyParts,
    now_millis: i64,
    end_coordinate: Coordinate,
    mode: TransportMode,
) -> Journey {
    let duration_seconds = ((now_millis - parts.started_at_millis).max(0) / 1000) as u64;

    Journey {
        id: next_journey_id(now_millis),
        start_time: millis_to_datetime(parts.started_at_millis),
        end_time: millis_to_datetime(now_millis),
        start_location: parts.start_location,
        end_location: NamedLocation::from_coordinate(end_coordinate),
        distance_km: parts.distance_km,
        max_speed_kmh: parts.max_speed_kmh,
        avg_speed_kmh: parts.avg_speed_kmh,
        duration_seconds,
        transport_mode: mode,
        path: parts.path,
    }
}

/// Generate a journey id from the end time plus a process-wide sequence.
pub fn next_journey_id(now_millis: i64) -> String {
    let seq = JOURNEY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", now_millis, seq)
}

/// Epoch milliseconds to a UTC timestamp, clamping unrepresentable values to the epoch.
pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

impl Journey {
    /// Number of recorded path points.
    pub fn point_count(&self) -> usize {
        self.path.len()
    }

    /// Path coordinates in order.
    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.path.iter().map(|p| p.coordinate).collect()
    }

    /// Bounding box of the recorded path.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_coordinates(self.path.iter().map(|p| &p.coordinate))
    }

    /// Simplified path for thumbnails, using Douglas-Peucker.
    ///
    /// `tolerance_degrees` of 0.0001 is roughly 11 meters. Paths with fewer
    /// than three points are returned unchanged.
    pub fn preview_path(&self, tolerance_degrees: f64) -> Vec<Coordinate> {
        let coords: Vec<Coord> = self
            .path
            .iter()
            .filter(|p| p.coordinate.is_valid())
            .map(|p| Coord {
                x: p.coordinate.longitude,
                y: p.coordinate.latitude,
            })
            .collect();

        if coords.len() < 3 {
            return coords.iter().map(|c| Coordinate::new(c.y, c.x)).collect();
        }

        let line = LineString::new(coords);
        line.simplify(&tolerance_degrees)
            .0
            .iter()
            .map(|c| Coordinate::new(c.y, c.x))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lng: f64, t: i64, speed: f64) -> PathPoint {
        PathPoint {
            coordinate: Coordinate::new(lat, lng),
            timestamp_millis: t,
            speed_kmh: speed,
        }
    }

    fn parts() -> JourneyParts {
        JourneyParts {
            started_at_millis: 1_700_000_000_000,
            start_location: NamedLocation::from_coordinate(Coordinate::new(51.5074, -0.1278)),
            distance_km: 1.25,
            max_speed_kmh: 30.0,
            avg_speed_kmh: 20.0,
            path: vec![
                point(51.5074, -0.1278, 1_700_000_000_000, 0.0),
                point(51.5080, -0.1290, 1_700_000_060_000, 30.0),
            ],
        }
    }

    #[test]
    fn test_location_name() {
        assert_eq!(location_name(&Coordinate::new(51.50741, -0.12783)), "51.5074, -0.1278");
    }

    #[test]
    fn test_build_journey() {
        let end = Coordinate::new(51.5080, -0.1290);
        let journey = build_journey(parts(), 1_700_000_125_500, end, TransportMode::Running);

        assert_eq!(journey.duration_seconds, 125);
        assert_eq!(journey.end_location.name, "51.5080, -0.1290");
        assert_eq!(journey.transport_mode, TransportMode::Running);
        assert_eq!(journey.point_count(), 2);
        assert_eq!(journey.start_time.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(journey.end_time.timestamp_millis(), 1_700_000_125_500);
        assert!(journey.id.starts_with("1700000125500-"));
    }

    #[test]
    fn test_duration_never_negative() {
        let end = Coordinate::new(0.0, 0.0);
        let journey = build_journey(parts(), 1_600_000_000_000, end, TransportMode::Car);
        assert_eq!(journey.duration_seconds, 0);
    }

    #[test]
    fn test_ids_unique_within_same_millisecond() {
        let a = next_journey_id(42);
        let b = next_journey_id(42);
        assert_ne!(a, b);
    }

    #[test]
    fn test_json_field_names() {
        let journey = build_journey(parts(), 1_700_000_060_000, Coordinate::new(1.0, 2.0), TransportMode::Car);
        let value = serde_json::to_value(&journey).unwrap();

        for key in [
            "id",
            "startTime",
            "endTime",
            "startLocation",
            "endLocation",
            "distance",
            "maxSpeed",
            "avgSpeed",
            "duration",
            "mode",
            "path",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["mode"], "car");
        assert_eq!(value["endLocation"]["lat"], 1.0);
        assert_eq!(value["endLocation"]["name"], "1.0000, 2.0000");
        assert_eq!(value["path"][1]["speed"], 30.0);

        let back: Journey = serde_json::from_value(value).unwrap();
        assert_eq!(back, journey);
    }

    #[test]
    fn test_parses_browser_timestamps() {
        let json = r#"{
            "id": "1700000060000",
            "startTime": "2023-11-14T22:13:20.000Z",
            "endTime": "2023-11-14T22:14:20.000Z",
            "startLocation": {"lat": 1.0, "lng": 2.0, "name": "1.0000, 2.0000"},
            "endLocation": {"lat": 1.0, "lng": 2.001, "name": "1.0000, 2.0010"},
            "distance": 0.11,
            "maxSpeed": 7.0,
            "avgSpeed": 6.5,
            "duration": 60,
            "mode": "walking",
            "path": []
        }"#;
        let journey: Journey = serde_json::from_str(json).unwrap();
        assert_eq!(journey.start_time.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(journey.transport_mode, TransportMode::Walking);
    }

    #[test]
    fn test_preview_path_simplifies_straight_line() {
        let mut p = parts();
        p.path = (0..20)
            .map(|i| point(0.0, i as f64 * 0.001, i as i64 * 1000, 10.0))
            .collect();
        let journey = build_journey(p, 1_700_000_100_000, Coordinate::new(0.0, 0.019), TransportMode::Car);

        let preview = journey.preview_path(0.0001);
        assert_eq!(preview.len(), 2);
        assert_eq!(preview[0], Coordinate::new(0.0, 0.0));

        let bounds = journey.bounds().unwrap();
        assert!((bounds.max_lng - 0.019).abs() < 1e-9);
    }
}
