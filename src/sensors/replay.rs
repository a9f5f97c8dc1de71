//! GPX track replay as a location source.
//!
//! Lets a recorded walk be pushed through the tracker exactly as live fixes
//! would be. `watch_position` must be called from within a tokio runtime.

use crate::sensors::location::{
    LocationError, LocationProvider, LocationUpdate, TrackingSample, WatchOptions,
};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, Receiver};

/// Accuracy assumed for points that carry no HDOP.
const DEFAULT_ACCURACY_M: f64 = 5.0;

/// Nominal user-equivalent range error used to turn HDOP into meters.
const UERE_M: f64 = 5.0;

/// Errors loading a replay track.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GPX parse error: {0}")]
    Parse(String),

    #[error("No track points found")]
    Empty,
}

/// Convert gpx Time to chrono DateTime
fn gpx_time_to_chrono(time: gpx::Time) -> Option<DateTime<Utc>> {
    // gpx::Time wraps time::OffsetDateTime, convert via string format
    let formatted = time.format().ok()?;
    DateTime::parse_from_rfc3339(&formatted)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse GPX content into position fixes, tracks first, then routes.
pub fn parse_gpx_samples(content: &[u8]) -> Result<Vec<TrackingSample>, ReplayError> {
    let gpx_data: gpx::Gpx = gpx::read(content).map_err(|e| ReplayError::Parse(e.to_string()))?;

    let mut waypoints: Vec<gpx::Waypoint> = gpx_data
        .tracks
        .into_iter()
        .flat_map(|track| track.segments)
        .flat_map(|segment| segment.points)
        .collect();

    if waypoints.is_empty() {
        waypoints = gpx_data
            .routes
            .into_iter()
            .flat_map(|route| route.points)
            .collect();
    }

    if waypoints.is_empty() {
        return Err(ReplayError::Empty);
    }

    let now = Utc::now();
    let samples = waypoints
        .into_iter()
        .map(|point| {
            let accuracy_m = point
                .hdop
                .map(|hdop| hdop * UERE_M)
                .unwrap_or(DEFAULT_ACCURACY_M);
            let timestamp = point.time.and_then(gpx_time_to_chrono).unwrap_or(now);
            TrackingSample::new(point.point().y(), point.point().x(), accuracy_m).at(timestamp)
        })
        .collect();

    Ok(samples)
}

/// Wall-clock wait for a recorded gap played back `rate` times faster.
/// Saturates instead of overflowing for very slow rates.
fn replay_delay(gap: Duration, rate: f64) -> Duration {
    Duration::try_from_secs_f64(gap.as_secs_f64() / rate).unwrap_or(Duration::MAX)
}

/// Location provider that replays a fixed list of fixes.
pub struct GpxReplayProvider {
    samples: Vec<TrackingSample>,
    /// Playback rate relative to the recorded timestamps; `None` replays
    /// without delays.
    speedup: Option<f64>,
}

impl GpxReplayProvider {
    /// Build a provider from already parsed samples.
    pub fn new(samples: Vec<TrackingSample>) -> Self {
        Self {
            samples,
            speedup: None,
        }
    }

    /// Load a provider from a GPX file.
    pub fn from_file(path: &Path) -> Result<Self, ReplayError> {
        let content = std::fs::read(path)?;
        Ok(Self::new(parse_gpx_samples(&content)?))
    }

    /// Pace playback by the recorded timestamps, `speedup` times faster.
    pub fn with_speedup(mut self, speedup: f64) -> Self {
        self.speedup = (speedup.is_finite() && speedup > 0.0).then_some(speedup);
        self
    }

    /// Number of fixes in the track.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the track has no fixes.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl LocationProvider for GpxReplayProvider {
    fn watch_position(
        &mut self,
        _options: &WatchOptions,
    ) -> Result<Receiver<LocationUpdate>, LocationError> {
        let (tx, rx) = mpsc::channel(64);
        let samples = self.samples.clone();
        let speedup = self.speedup;

        tracing::info!("Replaying {} recorded fixes", samples.len());

        tokio::spawn(async move {
            let mut previous: Option<DateTime<Utc>> = None;
            for sample in samples {
                if let (Some(rate), Some(prev)) = (speedup, previous) {
                    let gap = (sample.timestamp - prev).to_std().unwrap_or_default();
                    tokio::time::sleep(replay_delay(gap, rate)).await;
                }
                previous = Some(sample.timestamp);

                if tx.send(Ok(sample)).await.is_err() {
                    tracing::debug!("Replay watch cancelled");
                    return;
                }
            }
        });

        Ok(rx)
    }
}
