//! Read-only tracker state published to display components.

use crate::sensors::location::GeoPosition;
use crate::tracking::estimator::StepEstimator;
use serde::{Deserialize, Serialize};

/// Tracking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    /// No session running
    #[default]
    Idle,
    /// Session running, samples are applied
    Tracking,
}

impl std::fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingStatus::Idle => write!(f, "Idle"),
            TrackingStatus::Tracking => write!(f, "Tracking"),
        }
    }
}

/// Snapshot of the estimator for readers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerState {
    /// Estimated step count
    pub steps: u64,
    /// Walked distance in kilometers
    pub distance_km: f64,
    /// Whether a session is running
    pub is_tracking: bool,
    /// Last user-facing error, cleared when a session starts
    pub error: Option<String>,
    /// Most recent accepted fix
    pub last_position: Option<GeoPosition>,
}

impl TrackerState {
    /// Build a snapshot from the estimator and session flags.
    pub fn capture(estimator: &StepEstimator, is_tracking: bool, error: Option<String>) -> Self {
        Self {
            steps: estimator.steps(),
            distance_km: estimator.distance_km(),
            is_tracking,
            error,
            last_position: estimator.last_position(),
        }
    }

    /// Current status.
    pub fn status(&self) -> TrackingStatus {
        if self.is_tracking {
            TrackingStatus::Tracking
        } else {
            TrackingStatus::Idle
        }
    }
}
