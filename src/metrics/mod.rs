//! Metrics module for distance and energy calculations.

pub mod calories;
pub mod distance;

pub use calories::{estimate_kcal, met_for_speed, WALKING_MET};
pub use distance::{haversine_distance_m, steps_for_distance, EARTH_RADIUS_KM};
