//! Tracking session lifecycle.
//!
//! [`StepTracker`] owns the sensor providers and the estimator. Starting a
//! session subscribes to location (and the accelerometer when present) and
//! returns a [`TrackingSession`] handle; stopping consumes that handle.
//!
//! Every live stream is pumped by one tokio task. Samples are applied under
//! the same lock that session changes take, after checking that the sample's
//! session is still the current one, so once `stop_tracking` returns no
//! sample from that session can change the state. `start_tracking` must be
//! called from within a tokio runtime.

use crate::sensors::imu::{AccelerometerSample, MotionProvider};
use crate::sensors::location::{LocationError, LocationProvider, LocationUpdate, WatchOptions};
use crate::sensors::types::{SensorError, SensorKind, SubscriptionState};
use crate::storage::config::{TrackerSettings, UserProfile};
use crate::tracking::estimator::StepEstimator;
use crate::tracking::state::TrackerState;
use crate::tracking::summary::{session_kcal, SessionEnd, SessionSummary};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::mpsc::Receiver;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Errors returned by [`StepTracker::start_tracking`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// Location could not be subscribed to; also recorded in the state
    #[error(transparent)]
    Location(#[from] LocationError),

    /// A session is already running
    #[error("A tracking session is already running")]
    AlreadyTracking,

    /// Settings the estimator cannot work with
    #[error("{0}")]
    InvalidSettings(String),
}

/// Handle of a running session, required to stop it.
#[derive(Debug, PartialEq, Eq)]
pub struct TrackingSession {
    id: Uuid,
}

impl TrackingSession {
    /// Session identifier, also carried by its summary.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Subscription state of both sensor streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorStatus {
    pub location: SubscriptionState,
    pub accelerometer: SubscriptionState,
}

struct ActiveSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    steps_at_start: u64,
    distance_at_start_km: f64,
    accelerometer_used: bool,
    /// Dropping this wakes the pump tasks so they release their streams.
    _shutdown: watch::Sender<()>,
}

struct Core {
    estimator: StepEstimator,
    active: Option<ActiveSession>,
    error: Option<String>,
    /// Summary of a session that ended on its own, kept for its stopper
    finished: Option<SessionSummary>,
    sensors: SensorStatus,
    weight_kg: f64,
    publisher: watch::Sender<TrackerState>,
}

impl Core {
    fn snapshot(&self) -> TrackerState {
        TrackerState::capture(&self.estimator, self.active.is_some(), self.error.clone())
    }

    fn publish(&self) {
        self.publisher.send_replace(self.snapshot());
    }

    fn is_current(&self, id: Uuid) -> bool {
        self.active.as_ref().is_some_and(|session| session.id == id)
    }

    /// End the active session and summarize it.
    fn finish(&mut self, end: SessionEnd) -> Option<SessionSummary> {
        let session = self.active.take()?;
        let ended_at = Utc::now();

        let steps = self.estimator.steps().saturating_sub(session.steps_at_start);
        let distance_km = (self.estimator.distance_km() - session.distance_at_start_km).max(0.0);
        let duration = (ended_at - session.started_at).to_std().unwrap_or_default();

        self.sensors.location = match end {
            SessionEnd::Stopped => SubscriptionState::Inactive,
            SessionEnd::LocationError(_) => SubscriptionState::Failed,
        };
        if self.sensors.accelerometer == SubscriptionState::Streaming {
            self.sensors.accelerometer = SubscriptionState::Inactive;
        }
        self.estimator.set_accelerometer_live(false);

        Some(SessionSummary {
            session_id: session.id,
            started_at: session.started_at,
            ended_at,
            end,
            steps,
            distance_km,
            step_source: self.estimator.settings().step_source,
            accelerometer_used: session.accelerometer_used,
            estimated_kcal: session_kcal(steps, distance_km, duration, self.weight_kg),
        })
    }

    /// End the session `id` because its location watch failed.
    fn fail(&mut self, id: Uuid, error: LocationError) {
        if !self.is_current(id) {
            return;
        }
        tracing::warn!("Location watch failed, ending session {}: {}", id, error);
        self.error = Some(error.to_string());
        self.finished = self.finish(SessionEnd::LocationError(error.to_string()));
        self.publish();
    }
}

fn lock(core: &Mutex<Core>) -> MutexGuard<'_, Core> {
    core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Step and distance tracker.
pub struct StepTracker {
    settings: TrackerSettings,
    location: Option<Box<dyn LocationProvider>>,
    motion: Option<Box<dyn MotionProvider>>,
    core: Arc<Mutex<Core>>,
    state_rx: watch::Receiver<TrackerState>,
    location_task: Option<JoinHandle<()>>,
    motion_task: Option<JoinHandle<()>>,
}

impl StepTracker {
    /// Create an idle tracker with no sensors attached.
    pub fn new(settings: TrackerSettings) -> Self {
        let estimator = StepEstimator::new(settings.clone());
        let (publisher, state_rx) = watch::channel(TrackerState::default());

        let core = Core {
            estimator,
            active: None,
            error: None,
            finished: None,
            sensors: SensorStatus::default(),
            weight_kg: UserProfile::default().weight_kg,
            publisher,
        };

        Self {
            settings,
            location: None,
            motion: None,
            core: Arc::new(Mutex::new(core)),
            state_rx,
            location_task: None,
            motion_task: None,
        }
    }

    /// Create a tracker with default settings.
    pub fn with_defaults() -> Self {
        Self::new(TrackerSettings::default())
    }

    /// Attach the platform location service.
    pub fn with_location(mut self, provider: impl LocationProvider + 'static) -> Self {
        self.location = Some(Box::new(provider));
        self
    }

    /// Attach the platform motion service.
    pub fn with_motion(mut self, provider: impl MotionProvider + 'static) -> Self {
        self.motion = Some(Box::new(provider));
        self
    }

    /// Use the profile's weight for energy estimates.
    pub fn with_profile(self, profile: &UserProfile) -> Self {
        lock(&self.core).weight_kg = profile.weight_kg;
        self
    }

    /// Settings in use.
    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Current state snapshot.
    pub fn state(&self) -> TrackerState {
        self.state_rx.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<TrackerState> {
        self.state_rx.clone()
    }

    /// Subscription state of both sensor streams.
    pub fn sensor_status(&self) -> SensorStatus {
        lock(&self.core).sensors
    }

    /// Whether a session is running.
    pub fn is_tracking(&self) -> bool {
        lock(&self.core).active.is_some()
    }

    /// Start a tracking session.
    ///
    /// Location failures are written to the state's `error` field and also
    /// returned. A missing or refused accelerometer only degrades the session
    /// to GPS-only mode.
    pub fn start_tracking(&mut self) -> Result<TrackingSession, TrackerError> {
        if lock(&self.core).active.is_some() {
            return Err(TrackerError::AlreadyTracking);
        }
        if let Err(error) = self.settings.validate() {
            let error = TrackerError::InvalidSettings(error.to_string());
            tracing::warn!("Could not start tracking: {}", error);
            let mut core = lock(&self.core);
            core.error = Some(error.to_string());
            core.publish();
            return Err(error);
        }
        self.abort_tasks();

        let location_rx = match self.location.as_mut() {
            Some(provider) => provider.watch_position(&WatchOptions::default()),
            None => Err(LocationError::Unsupported),
        };
        let location_rx = match location_rx {
            Ok(rx) => rx,
            Err(error) => return Err(self.record_start_failure(error)),
        };

        let motion_rx = match self.motion.as_mut() {
            Some(provider) => provider.start_accelerometer(self.settings.accel_frequency_hz),
            None => Err(SensorError::SensorUnavailable(SensorKind::Accelerometer)),
        };
        let motion_rx = match motion_rx {
            Ok(rx) => Some(rx),
            Err(error) => {
                tracing::warn!("{}; tracking in GPS-only mode", error);
                None
            }
        };
        let accelerometer_used = motion_rx.is_some();

        if !self.settings.step_source.can_count_steps(accelerometer_used) {
            tracing::warn!(
                "Step source '{}' cannot count steps without an accelerometer; only distance will be tracked",
                self.settings.step_source
            );
        }

        let id = Uuid::new_v4();
        let (shutdown_tx, shutdown_rx) = watch::channel(());

        {
            let mut core = lock(&self.core);
            core.estimator.begin_session(accelerometer_used);
            core.error = None;
            core.finished = None;
            core.sensors = SensorStatus {
                location: SubscriptionState::Streaming,
                accelerometer: if accelerometer_used {
                    SubscriptionState::Streaming
                } else {
                    SubscriptionState::Failed
                },
            };
            core.active = Some(ActiveSession {
                id,
                started_at: Utc::now(),
                steps_at_start: core.estimator.steps(),
                distance_at_start_km: core.estimator.distance_km(),
                accelerometer_used,
                _shutdown: shutdown_tx,
            });
            core.publish();
        }

        self.location_task = Some(tokio::spawn(pump_location(
            self.core.clone(),
            id,
            location_rx,
            shutdown_rx.clone(),
        )));
        if let Some(rx) = motion_rx {
            self.motion_task = Some(tokio::spawn(pump_motion(
                self.core.clone(),
                id,
                rx,
                shutdown_rx,
            )));
        }

        tracing::info!(
            "Tracking session {} started ({})",
            id,
            if accelerometer_used {
                "GPS + accelerometer"
            } else {
                "GPS only"
            }
        );

        Ok(TrackingSession { id })
    }

    fn record_start_failure(&mut self, error: LocationError) -> TrackerError {
        tracing::warn!("Could not start tracking: {}", error);
        let mut core = lock(&self.core);
        core.error = Some(error.to_string());
        core.sensors.location = SubscriptionState::Failed;
        core.publish();
        TrackerError::Location(error)
    }

    /// Stop a session and return its summary.
    ///
    /// Counters are kept. Returns `None` for a stale handle whose summary was
    /// already taken; the running session, if any, is left alone in that case.
    pub fn stop_tracking(&mut self, session: TrackingSession) -> Option<SessionSummary> {
        let (summary, was_current) = {
            let mut core = lock(&self.core);
            if core.is_current(session.id) {
                let summary = core.finish(SessionEnd::Stopped);
                core.publish();
                (summary, true)
            } else if core
                .finished
                .as_ref()
                .is_some_and(|summary| summary.session_id == session.id)
            {
                (core.finished.take(), false)
            } else {
                (None, false)
            }
        };

        if was_current {
            self.abort_tasks();
            tracing::info!("Tracking session {} stopped", session.id);
        }

        summary
    }

    /// Zero steps and distance. The tracking status is unchanged and the next
    /// fix starts a fresh displacement baseline.
    pub fn reset_steps(&self) {
        let mut core = lock(&self.core);
        core.estimator.reset();
        if let Some(session) = core.active.as_mut() {
            session.steps_at_start = 0;
            session.distance_at_start_km = 0.0;
        }
        core.publish();
        tracing::info!("Step and distance counters reset");
    }

    /// Wait until the current location stream ends, either because its
    /// source closed it or because the session ended.
    pub async fn location_finished(&mut self) {
        if let Some(handle) = self.location_task.take() {
            let _ = handle.await;
        }
    }

    /// End any running session and release the sensor streams.
    pub fn shutdown(&mut self) -> Option<SessionSummary> {
        tracing::info!("Shutting down StepTracker");
        let summary = {
            let mut core = lock(&self.core);
            let summary = core.finish(SessionEnd::Stopped);
            core.publish();
            summary
        };
        self.abort_tasks();
        summary
    }

    fn abort_tasks(&mut self) {
        if let Some(handle) = self.location_task.take() {
            handle.abort();
        }
        if let Some(handle) = self.motion_task.take() {
            handle.abort();
        }
    }
}

impl Drop for StepTracker {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

async fn pump_location(
    core: Arc<Mutex<Core>>,
    id: Uuid,
    mut updates: Receiver<LocationUpdate>,
    mut shutdown: watch::Receiver<()>,
) {
    loop {
        let update = tokio::select! {
            _ = shutdown.changed() => break,
            update = updates.recv() => update,
        };
        let mut guard = lock(&core);
        if !guard.is_current(id) {
            break;
        }
        let Some(update) = update else {
            tracing::debug!("Location stream closed for session {}", id);
            guard.sensors.location = SubscriptionState::Inactive;
            break;
        };

        match update {
            Ok(sample) => {
                guard.estimator.on_location_sample(&sample);
                guard.publish();
            }
            Err(error) => {
                guard.fail(id, error);
                break;
            }
        }
    }
}

async fn pump_motion(
    core: Arc<Mutex<Core>>,
    id: Uuid,
    mut readings: Receiver<AccelerometerSample>,
    mut shutdown: watch::Receiver<()>,
) {
    loop {
        let reading = tokio::select! {
            _ = shutdown.changed() => break,
            reading = readings.recv() => reading,
        };

        let mut guard = lock(&core);
        if !guard.is_current(id) {
            break;
        }
        let Some(reading) = reading else {
            tracing::warn!("Accelerometer stream closed; continuing GPS-only");
            guard.estimator.set_accelerometer_live(false);
            guard.sensors.accelerometer = SubscriptionState::Failed;
            break;
        };

        if guard.estimator.on_accelerometer_sample(&reading) {
            tracing::trace!("Accelerometer step at {:.2}", reading.magnitude());
            guard.publish();
        }
    }
}
