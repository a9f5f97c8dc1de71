//! Per-session results handed back when a session ends.

use crate::metrics::calories::{estimate_kcal, met_for_speed};
use crate::tracking::estimator::StepSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum SessionEnd {
    /// Stopped by the caller
    Stopped,
    /// Ended by a location error
    LocationError(String),
}

/// Totals accrued during one tracking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub end: SessionEnd,
    /// Steps counted during the session (since the last reset, if any)
    pub steps: u64,
    /// Distance walked during the session in kilometers
    pub distance_km: f64,
    pub step_source: StepSource,
    /// Whether an accelerometer stream fed the session
    pub accelerometer_used: bool,
    pub estimated_kcal: f64,
}

impl SessionSummary {
    /// Elapsed session time.
    pub fn duration(&self) -> Duration {
        (self.ended_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Average speed in km/h, if any time elapsed.
    pub fn average_speed_kmh(&self) -> Option<f64> {
        let hours = self.duration().as_secs_f64() / 3600.0;
        (hours > 0.0).then(|| self.distance_km / hours)
    }

    /// Average pace in minutes per kilometer, if any distance was covered.
    pub fn pace_min_per_km(&self) -> Option<f64> {
        (self.distance_km > 0.0).then(|| self.duration().as_secs_f64() / 60.0 / self.distance_km)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Energy estimate for a session from its totals and the user's weight.
pub(crate) fn session_kcal(steps: u64, distance_km: f64, duration: Duration, weight_kg: f64) -> f64 {
    if steps == 0 && distance_km <= 0.0 {
        return 0.0;
    }
    let hours = duration.as_secs_f64() / 3600.0;
    let speed_kmh = if hours > 0.0 { distance_km / hours } else { 0.0 };
    estimate_kcal(met_for_speed(speed_kmh), weight_kg, duration)
}
