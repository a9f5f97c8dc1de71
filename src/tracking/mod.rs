//! Step tracking: estimator, session lifecycle and published state.

pub mod estimator;
pub mod state;
pub mod summary;
pub mod tracker;

pub use estimator::{LocationOutcome, StepEstimator, StepSource};
pub use state::{TrackerState, TrackingStatus};
pub use summary::{SessionEnd, SessionSummary};
pub use tracker::{SensorStatus, StepTracker, TrackerError, TrackingSession};
