//! MET-based energy expenditure estimates.

use std::time::Duration;

/// MET value for walking at a moderate pace.
pub const WALKING_MET: f64 = 3.5;

/// MET value for brisk walking (faster than ~6 km/h).
pub const BRISK_WALKING_MET: f64 = 5.0;

/// MET value for running.
pub const RUNNING_MET: f64 = 9.8;

/// Pick a MET value from an average speed in km/h.
pub fn met_for_speed(speed_kmh: f64) -> f64 {
    if speed_kmh >= 8.0 {
        RUNNING_MET
    } else if speed_kmh >= 6.0 {
        BRISK_WALKING_MET
    } else {
        WALKING_MET
    }
}

/// Estimate kilocalories burned: `MET × weight_kg × hours`.
pub fn estimate_kcal(met: f64, weight_kg: f64, duration: Duration) -> f64 {
    if met <= 0.0 || weight_kg <= 0.0 {
        return 0.0;
    }
    met * weight_kg * duration.as_secs_f64() / 3600.0
}
