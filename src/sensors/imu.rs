//! Accelerometer samples and the motion provider seam.
//!
//! Readings are expressed in g-equivalent units. Each sample is consumed by
//! the estimator as soon as it arrives and never retained.

use crate::sensors::types::SensorError;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Receiver;

/// 3D vector for accelerometer readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    /// X-axis component (left-right)
    pub x: f64,
    /// Y-axis component (up-down)
    pub y: f64,
    /// Z-axis component (forward-backward)
    pub z: f64,
}

impl Vector3 {
    /// Create a new vector with specified components.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Create a zero vector.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Calculate the magnitude (length) of the vector.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// An instantaneous linear accelerometer reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccelerometerSample {
    pub acceleration: Vector3,
}

impl AccelerometerSample {
    /// Create a sample from its three axes.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            acceleration: Vector3::new(x, y, z),
        }
    }

    /// Sample whose magnitude equals `magnitude`, placed on the vertical axis.
    pub fn vertical(magnitude: f64) -> Self {
        Self::new(0.0, magnitude, 0.0)
    }

    /// Total acceleration magnitude.
    pub fn magnitude(&self) -> f64 {
        self.acceleration.magnitude()
    }
}

/// Platform motion sensor service.
///
/// Like location watches, an accelerometer subscription is cancelled by
/// dropping its receiver.
pub trait MotionProvider: Send {
    /// Start streaming accelerometer readings at `frequency_hz`.
    fn start_accelerometer(
        &mut self,
        frequency_hz: u32,
    ) -> Result<Receiver<AccelerometerSample>, SensorError>;
}
