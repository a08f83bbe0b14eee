//! Geographic utilities: great-circle distance and derived speed.
//!
//! All functions are pure and total. Degenerate inputs (identical points,
//! zero or negative elapsed time) produce zero rather than NaN or infinity.

use crate::Coordinate;

/// Mean Earth radius used by the haversine formula (km).
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Seconds per hour, for km/s -> km/h.
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Great-circle distance between two coordinates in kilometers.
///
/// Symmetric, and exactly zero for identical coordinates.
///
/// # Example
/// ```
/// use speedsync::{haversine_distance_km, Coordinate};
///
/// let london = Coordinate::new(51.5074, -0.1278);
/// let paris = Coordinate::new(48.8566, 2.3522);
/// let km = haversine_distance_km(&london, &paris);
/// assert!((km - 343.5).abs() < 1.0);
/// ```
pub fn haversine_distance_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlng = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Speed in km/h from a distance (km) covered in `elapsed_seconds`.
///
/// Returns 0 when no time has passed (duplicate or out-of-order timestamps).
pub fn speed_kmh_from_distance_time(distance_km: f64, elapsed_seconds: f64) -> f64 {
    if elapsed_seconds <= 0.0 || !elapsed_seconds.is_finite() || !distance_km.is_finite() {
        return 0.0;
    }
    (distance_km / elapsed_seconds * SECONDS_PER_HOUR).max(0.0)
}

/// Convert a provider speed in m/s to km/h.
pub fn mps_to_kmh(speed_mps: f64) -> f64 {
    speed_mps * 3.6
}
