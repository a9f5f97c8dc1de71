//! Sensor module: location and motion sources for the step tracker.

pub mod imu;
pub mod location;
pub mod replay;
pub mod simulated;
pub mod types;

pub use imu::{AccelerometerSample, MotionProvider, Vector3};
pub use location::{
    GeoPosition, LocationError, LocationProvider, LocationUpdate, TrackingSample, WatchOptions,
};
pub use replay::{GpxReplayProvider, ReplayError};
pub use simulated::{
    ChannelLocationProvider, ChannelMotionProvider, LocationFeed, MotionFeed, SimulatedAccess,
};
pub use types::{SensorError, SensorKind, SubscriptionState};
