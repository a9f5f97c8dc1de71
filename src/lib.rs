//! StepTrack - Step and Distance Estimation
//!
//! Estimates a walker's step count and distance from two device sensor
//! streams: geolocation fixes (haversine displacement converted to steps
//! with a stride constant) and an optional accelerometer (threshold-based
//! step detection). State is published read-only to display components.

pub mod metrics;
pub mod sensors;
pub mod storage;
pub mod tracking;

// Re-export commonly used types
pub use sensors::{AccelerometerSample, GeoPosition, LocationError, TrackingSample};
pub use storage::config::{AppConfig, TrackerSettings, UserProfile};
pub use tracking::{
    SessionSummary, StepEstimator, StepSource, StepTracker, TrackerState, TrackingSession,
};
