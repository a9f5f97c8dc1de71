//! Geolocation samples and the platform location provider seam.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::Receiver;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPosition {
    /// Create a new position.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check that both coordinates are finite and within range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A position fix reported by the platform geolocation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSample {
    /// Reported position
    pub position: GeoPosition,
    /// Horizontal accuracy radius in meters
    pub accuracy_m: f64,
    /// Time the fix was taken
    pub timestamp: DateTime<Utc>,
}

impl TrackingSample {
    /// Create a sample stamped with the current time.
    pub fn new(latitude: f64, longitude: f64, accuracy_m: f64) -> Self {
        Self {
            position: GeoPosition::new(latitude, longitude),
            accuracy_m,
            timestamp: Utc::now(),
        }
    }

    /// Replace the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Options for a continuous location watch.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchOptions {
    /// Ask the platform for its most accurate positioning mode
    pub enable_high_accuracy: bool,
    /// Maximum age of a cached fix the platform may return, in milliseconds.
    /// Zero disables caching.
    pub maximum_age_ms: u64,
    /// Per-fix timeout in milliseconds; `None` leaves it to platform policy
    pub timeout_ms: Option<u64>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            maximum_age_ms: 0,
            timeout_ms: None,
        }
    }
}

/// Location errors. Any of them ends the current tracking session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The platform has no geolocation capability
    #[error("Geolocation is not supported by this device")]
    Unsupported,

    /// The user or platform denied location access
    #[error("Location permission denied")]
    PermissionDenied,

    /// The platform could not determine a position
    #[error("Position unavailable: {0}")]
    PositionUnavailable(String),

    /// The platform timed out acquiring a fix
    #[error("Timed out waiting for a location fix")]
    Timeout,
}

/// One item of a location watch stream.
pub type LocationUpdate = Result<TrackingSample, LocationError>;

/// Platform geolocation service.
///
/// A watch stays registered for as long as its receiver is alive; dropping
/// the receiver cancels it.
pub trait LocationProvider: Send {
    /// Start a continuous position watch.
    fn watch_position(
        &mut self,
        options: &WatchOptions,
    ) -> Result<Receiver<LocationUpdate>, LocationError>;
}
