//! Shared sensor types and errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of motion sensor; location failures use `LocationError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Linear accelerometer
    Accelerometer,
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorKind::Accelerometer => write!(f, "Accelerometer"),
        }
    }
}

/// Subscription state of a sensor stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionState {
    /// No active subscription
    #[default]
    Inactive,
    /// Samples are being delivered
    Streaming,
    /// Subscription ended because of an error
    Failed,
}

impl std::fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionState::Inactive => write!(f, "Inactive"),
            SubscriptionState::Streaming => write!(f, "Streaming"),
            SubscriptionState::Failed => write!(f, "Failed"),
        }
    }
}

/// Errors raised by non-location sensors.
///
/// None of these end a tracking session; the tracker degrades to
/// GPS-only mode and logs the cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    /// The platform exposes no such sensor
    #[error("{0} sensor is not available on this device")]
    SensorUnavailable(SensorKind),

    /// The user or platform refused access
    #[error("Permission to use the {0} sensor was denied")]
    PermissionDenied(SensorKind),

    /// The platform rejected the subscription request
    #[error("Failed to subscribe to {kind} sensor: {reason}")]
    SubscriptionFailed { kind: SensorKind, reason: String },
}
