//! Step and distance estimator.
//!
//! Turns two unsynchronized sensor streams into a step count and a walked
//! distance:
//!
//! - GPS fixes: the haversine distance between consecutive fixes is added to
//!   the distance, and `round(distance / stride)` steps are derived from it.
//! - Accelerometer readings: every reading whose magnitude exceeds the
//!   threshold counts as one step.
//!
//! Both sources can see the same physical step, so [`StepSource`] decides
//! which of them is allowed to count steps in a session. Distance always
//! comes from GPS.
//!
//! The accelerometer path has no peak detection. With the refractory window
//! disabled (the default) a sustained reading above threshold counts a step
//! on every sample, which at 60 Hz overcounts heavily during a single shake.

use crate::metrics::distance::{haversine_distance_m, steps_for_distance};
use crate::sensors::imu::AccelerometerSample;
use crate::sensors::location::{GeoPosition, TrackingSample};
use crate::storage::config::TrackerSettings;
use serde::{Deserialize, Serialize};

/// Which sensor is authoritative for the step count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSource {
    /// Accelerometer counts steps while its stream is live; GPS-derived steps
    /// are used only when it is not
    #[default]
    PreferAccelerometer,
    /// Steps only from GPS displacement
    GpsOnly,
    /// Steps only from the accelerometer
    AccelerometerOnly,
    /// Both sources add to the same counter
    Additive,
}

impl StepSource {
    /// Whether GPS displacement may add steps.
    pub fn gps_counts_steps(&self, accelerometer_live: bool) -> bool {
        match self {
            StepSource::PreferAccelerometer => !accelerometer_live,
            StepSource::GpsOnly | StepSource::Additive => true,
            StepSource::AccelerometerOnly => false,
        }
    }

    /// Whether accelerometer readings may add steps.
    pub fn accelerometer_counts_steps(&self) -> bool {
        !matches!(self, StepSource::GpsOnly)
    }

    /// Whether any sensor can count steps in a session.
    pub fn can_count_steps(&self, accelerometer_live: bool) -> bool {
        self.gps_counts_steps(accelerometer_live)
            || (accelerometer_live && self.accelerometer_counts_steps())
    }

    /// Get a human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            StepSource::PreferAccelerometer => "Accelerometer, GPS fallback",
            StepSource::GpsOnly => "GPS only",
            StepSource::AccelerometerOnly => "Accelerometer only",
            StepSource::Additive => "GPS and accelerometer combined",
        }
    }
}

impl std::fmt::Display for StepSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Effect of a single location fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationOutcome {
    /// First fix since start or reset; stored as the baseline only
    Baseline,
    /// Distance and steps added against the previous fix
    Advanced { distance_m: f64, steps: u64 },
    /// Fix rejected (invalid coordinates or accuracy above the limit)
    Discarded,
}

/// Step and distance accumulator.
#[derive(Debug, Clone)]
pub struct StepEstimator {
    settings: TrackerSettings,
    steps: u64,
    distance_km: f64,
    /// Fix the next displacement is measured from
    baseline: Option<GeoPosition>,
    /// Most recent accepted fix, kept across resets for display
    last_position: Option<GeoPosition>,
    accelerometer_live: bool,
    refractory_remaining: u32,
}

impl StepEstimator {
    /// Create an estimator with all counters at zero.
    pub fn new(settings: TrackerSettings) -> Self {
        Self {
            settings,
            steps: 0,
            distance_km: 0.0,
            baseline: None,
            last_position: None,
            accelerometer_live: false,
            refractory_remaining: 0,
        }
    }

    /// Settings in use.
    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Total steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Total distance in kilometers.
    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    /// Most recent accepted fix.
    pub fn last_position(&self) -> Option<GeoPosition> {
        self.last_position
    }

    /// Whether an accelerometer stream is feeding this estimator.
    pub fn accelerometer_live(&self) -> bool {
        self.accelerometer_live
    }

    /// Record whether an accelerometer stream is feeding this estimator.
    pub fn set_accelerometer_live(&mut self, live: bool) {
        self.accelerometer_live = live;
    }

    /// Prepare for a new session: the next fix becomes a fresh baseline.
    pub fn begin_session(&mut self, accelerometer_live: bool) {
        self.baseline = None;
        self.refractory_remaining = 0;
        self.accelerometer_live = accelerometer_live;
    }

    /// Zero the counters and drop the displacement baseline.
    pub fn reset(&mut self) {
        self.steps = 0;
        self.distance_km = 0.0;
        self.baseline = None;
        self.refractory_remaining = 0;
    }

    /// Apply a location fix.
    pub fn on_location_sample(&mut self, sample: &TrackingSample) -> LocationOutcome {
        if !sample.position.is_valid() {
            tracing::debug!("Discarding invalid fix {:?}", sample.position);
            return LocationOutcome::Discarded;
        }
        if let Some(max) = self.settings.max_accuracy_m {
            if sample.accuracy_m.is_nan() || sample.accuracy_m > max {
                tracing::debug!(
                    "Discarding fix with accuracy {:.1} m (limit {:.1} m)",
                    sample.accuracy_m,
                    max
                );
                return LocationOutcome::Discarded;
            }
        }

        let current = sample.position;
        self.last_position = Some(current);

        let Some(previous) = self.baseline.replace(current) else {
            return LocationOutcome::Baseline;
        };

        let distance_m = haversine_distance_m(&previous, &current);
        let steps = if self
            .settings
            .step_source
            .gps_counts_steps(self.accelerometer_live)
        {
            steps_for_distance(distance_m, self.settings.stride_length_m)
        } else {
            0
        };

        self.distance_km += distance_m / 1000.0;
        self.steps += steps;

        tracing::debug!("GPS advance: {:.1} m, +{} steps", distance_m, steps);

        LocationOutcome::Advanced { distance_m, steps }
    }

    /// Apply an accelerometer reading. Returns true when it counted a step.
    pub fn on_accelerometer_sample(&mut self, sample: &AccelerometerSample) -> bool {
        if !self.settings.step_source.accelerometer_counts_steps() {
            return false;
        }

        if self.refractory_remaining > 0 {
            self.refractory_remaining -= 1;
            return false;
        }

        if sample.magnitude() > self.settings.accel_threshold {
            self.steps += 1;
            self.refractory_remaining = self.settings.accel_refractory_samples;
            return true;
        }

        false
    }
}

impl Default for StepEstimator {
    fn default() -> Self {
        Self::new(TrackerSettings::default())
    }
}
