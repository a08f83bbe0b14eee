//! Derived display state.
//!
//! Pure functions over session and journey values. Nothing here is stored;
//! the dashboard recomputes these on every refresh.

use crate::{PathPoint, TransportMode};

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Format whole seconds as `HH:MM:SS`. Hours grow past two digits if needed.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Speed as a share of the mode's nominal top speed, in [0, 100].
pub fn speed_percentage(speed_kmh: f64, mode: TransportMode) -> f64 {
    if !speed_kmh.is_finite() {
        return 0.0;
    }
    (speed_kmh / mode.max_speed_kmh() * 100.0).clamp(0.0, 100.0)
}

/// 16-point compass label for a heading in degrees.
pub fn compass_direction(heading_deg: f64) -> &'static str {
    if !heading_deg.is_finite() {
        return COMPASS_POINTS[0];
    }
    let index = (heading_deg.rem_euclid(360.0) / 22.5).round() as usize % 16;
    COMPASS_POINTS[index]
}

/// Distance with two decimals and unit, e.g. `"12.35 km"`.
pub fn format_distance_km(distance_km: f64) -> String {
    format!("{:.2} km", distance_km)
}

/// Speed rounded to a whole number with unit, e.g. `"88 km/h"`.
pub fn format_speed_kmh(speed_kmh: f64) -> String {
    format!("{:.0} km/h", speed_kmh.round())
}

/// Colour band of a recorded speed on the route map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeedBand {
    /// 20 km/h and below
    Slow,
    /// Above 20 km/h
    Moderate,
    /// Above 50 km/h
    Fast,
}

impl SpeedBand {
    pub fn classify(speed_kmh: f64) -> Self {
        if speed_kmh > 50.0 {
            SpeedBand::Fast
        } else if speed_kmh > 20.0 {
            SpeedBand::Moderate
        } else {
            SpeedBand::Slow
        }
    }
}

/// Evenly spaced path points for speed markers, at most about `target` of them.
///
/// Takes every `max(1, len / target)`-th point starting with the first.
pub fn speed_markers(path: &[PathPoint], target: usize) -> Vec<(PathPoint, SpeedBand)> {
    if path.is_empty() || target == 0 {
        return Vec::new();
    }
    let step = (path.len() / target).max(1);
    path.iter()
        .step_by(step)
        .map(|p| (*p, SpeedBand::classify(p.speed_kmh)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Coordinate;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(59), "00:00:59");
        assert_eq!(format_duration(3661), "01:01:01");
        assert_eq!(format_duration(360_000), "100:00:00");
    }

    #[test]
    fn test_speed_percentage() {
        assert_eq!(speed_percentage(100.0, TransportMode::Car), 50.0);
        assert_eq!(speed_percentage(20.0, TransportMode::Walking), 100.0);
        assert_eq!(speed_percentage(-1.0, TransportMode::Car), 0.0);
        assert_eq!(speed_percentage(f64::NAN, TransportMode::Car), 0.0);
    }

    #[test]
    fn test_compass_direction() {
        assert_eq!(compass_direction(0.0), "N");
        assert_eq!(compass_direction(11.0), "N");
        assert_eq!(compass_direction(12.0), "NNE");
        assert_eq!(compass_direction(90.0), "E");
        assert_eq!(compass_direction(225.0), "SW");
        assert_eq!(compass_direction(350.0), "N");
        assert_eq!(compass_direction(-90.0), "W");
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_distance_km(12.345), "12.35 km");
        assert_eq!(format_distance_km(0.0), "0.00 km");
        assert_eq!(format_speed_kmh(87.6), "88 km/h");
    }

    #[test]
    fn test_speed_bands() {
        assert_eq!(SpeedBand::classify(0.0), SpeedBand::Slow);
        assert_eq!(SpeedBand::classify(20.0), SpeedBand::Slow);
        assert_eq!(SpeedBand::classify(20.1), SpeedBand::Moderate);
        assert_eq!(SpeedBand::classify(50.0), SpeedBand::Moderate);
        assert_eq!(SpeedBand::classify(50.1), SpeedBand::Fast);
    }

    #[test]
    fn test_speed_markers() {
        let path: Vec<PathPoint> = (0..20)
            .map(|i| PathPoint {
                coordinate: Coordinate::new(0.0, i as f64 * 0.001),
                timestamp_millis: i * 1000,
                speed_kmh: i as f64 * 5.0,
            })
            .collect();

        let markers = speed_markers(&path, 8);
        // step = 20 / 8 = 2
        assert_eq!(markers.len(), 10);
        assert_eq!(markers[0].1, SpeedBand::Slow);
        assert_eq!(markers[9].0.speed_kmh, 90.0);
        assert_eq!(markers[9].1, SpeedBand::Fast);

        assert_eq!(speed_markers(&path[..3], 8).len(), 3);
        assert!(speed_markers(&[], 8).is_empty());
    }
}
