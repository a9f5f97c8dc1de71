//! Channel-driven providers for simulation and testing.
//!
//! Each provider is created together with a feed handle. The provider is
//! handed to the tracker while the feed stays with the caller, who pushes
//! samples into whatever subscription is currently live.

use crate::sensors::imu::{AccelerometerSample, MotionProvider};
use crate::sensors::location::{
    LocationError, LocationProvider, LocationUpdate, TrackingSample, WatchOptions,
};
use crate::sensors::types::{SensorError, SensorKind};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, Receiver, Sender};

/// Channel capacity for simulated streams.
const STREAM_BUFFER: usize = 64;

/// Access the simulated platform grants to a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulatedAccess {
    /// Subscriptions succeed
    #[default]
    Granted,
    /// Subscriptions fail with a permission error
    Denied,
}

#[derive(Debug, Default)]
struct LocationFeedState {
    sender: Option<Sender<LocationUpdate>>,
    watch_count: u32,
    last_options: Option<WatchOptions>,
}

/// Location provider whose fixes come from a [`LocationFeed`].
pub struct ChannelLocationProvider {
    access: SimulatedAccess,
    shared: Arc<Mutex<LocationFeedState>>,
}

/// Caller-side handle of a [`ChannelLocationProvider`].
#[derive(Clone)]
pub struct LocationFeed {
    shared: Arc<Mutex<LocationFeedState>>,
}

impl ChannelLocationProvider {
    /// Create a provider that grants access.
    pub fn new() -> (Self, LocationFeed) {
        Self::with_access(SimulatedAccess::Granted)
    }

    /// Create a provider with the given access policy.
    pub fn with_access(access: SimulatedAccess) -> (Self, LocationFeed) {
        let shared = Arc::new(Mutex::new(LocationFeedState::default()));
        (
            Self {
                access,
                shared: shared.clone(),
            },
            LocationFeed { shared },
        )
    }
}

impl LocationProvider for ChannelLocationProvider {
    fn watch_position(
        &mut self,
        options: &WatchOptions,
    ) -> Result<Receiver<LocationUpdate>, LocationError> {
        if self.access == SimulatedAccess::Denied {
            return Err(LocationError::PermissionDenied);
        }

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let mut state = self
            .shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.sender = Some(tx);
        state.watch_count += 1;
        state.last_options = Some(options.clone());
        Ok(rx)
    }
}

impl LocationFeed {
    fn sender(&self) -> Option<Sender<LocationUpdate>> {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .sender
            .clone()
    }

    /// Deliver a fix to the live watch. Returns false when no watch is live.
    pub async fn push(&self, sample: TrackingSample) -> bool {
        self.send(Ok(sample)).await
    }

    /// Deliver a location error to the live watch.
    pub async fn fail(&self, error: LocationError) -> bool {
        self.send(Err(error)).await
    }

    async fn send(&self, update: LocationUpdate) -> bool {
        match self.sender() {
            Some(tx) => tx.send(update).await.is_ok(),
            None => false,
        }
    }

    /// End the live watch from the platform side.
    pub fn close(&self) {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .sender = None;
    }

    /// Whether a watch is registered and its receiver still alive.
    pub fn is_watching(&self) -> bool {
        self.sender().is_some_and(|tx| !tx.is_closed())
    }

    /// Number of watches started so far.
    pub fn watch_count(&self) -> u32 {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .watch_count
    }

    /// Options passed to the most recent watch.
    pub fn last_options(&self) -> Option<WatchOptions> {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .last_options
            .clone()
    }
}

#[derive(Debug, Default)]
struct MotionFeedState {
    sender: Option<Sender<AccelerometerSample>>,
    frequency_hz: Option<u32>,
}

/// Motion provider whose readings come from a [`MotionFeed`].
pub struct ChannelMotionProvider {
    access: SimulatedAccess,
    shared: Arc<Mutex<MotionFeedState>>,
}

/// Caller-side handle of a [`ChannelMotionProvider`].
#[derive(Clone)]
pub struct MotionFeed {
    shared: Arc<Mutex<MotionFeedState>>,
}

impl ChannelMotionProvider {
    /// Create a provider that grants access.
    pub fn new() -> (Self, MotionFeed) {
        Self::with_access(SimulatedAccess::Granted)
    }

    /// Create a provider with the given access policy.
    pub fn with_access(access: SimulatedAccess) -> (Self, MotionFeed) {
        let shared = Arc::new(Mutex::new(MotionFeedState::default()));
        (
            Self {
                access,
                shared: shared.clone(),
            },
            MotionFeed { shared },
        )
    }
}

impl MotionProvider for ChannelMotionProvider {
    fn start_accelerometer(
        &mut self,
        frequency_hz: u32,
    ) -> Result<Receiver<AccelerometerSample>, SensorError> {
        if self.access == SimulatedAccess::Denied {
            return Err(SensorError::PermissionDenied(SensorKind::Accelerometer));
        }

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let mut state = self
            .shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.sender = Some(tx);
        state.frequency_hz = Some(frequency_hz);
        Ok(rx)
    }
}

impl MotionFeed {
    fn sender(&self) -> Option<Sender<AccelerometerSample>> {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .sender
            .clone()
    }

    /// Deliver a reading to the live subscription.
    pub async fn push(&self, sample: AccelerometerSample) -> bool {
        match self.sender() {
            Some(tx) => tx.send(sample).await.is_ok(),
            None => false,
        }
    }

    /// End the live subscription from the platform side.
    pub fn close(&self) {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .sender = None;
    }

    /// Whether a subscription is registered and its receiver still alive.
    pub fn is_streaming(&self) -> bool {
        self.sender().is_some_and(|tx| !tx.is_closed())
    }

    /// Sampling rate requested by the most recent subscription.
    pub fn requested_frequency(&self) -> Option<u32> {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .frequency_hz
    }
}
