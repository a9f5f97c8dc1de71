//! Great-circle distance and stride-based step conversion.

use crate::sensors::location::GeoPosition;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Calculate the great-circle distance between two fixes in meters
/// (Haversine formula).
pub fn haversine_distance_m(from: &GeoPosition, to: &GeoPosition) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos()
            * to.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * 1000.0 * c
}

/// Convert a walked distance into a whole number of steps.
///
/// Returns zero for a non-positive stride or distance.
pub fn steps_for_distance(distance_m: f64, stride_m: f64) -> u64 {
    if stride_m.is_nan() || distance_m.is_nan() || stride_m <= 0.0 || distance_m <= 0.0 {
        return 0;
    }
    (distance_m / stride_m).round() as u64
}
