//! StepTrack - replay a recorded GPX walk through the step tracker.
//!
//! Usage: `steptrack <track.gpx> [speedup]`

use anyhow::{bail, Context};
use std::path::PathBuf;
use steptrack::sensors::GpxReplayProvider;
use steptrack::storage::config::load_config;
use steptrack::StepTracker;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting StepTrack v{}", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1);
    let Some(track_path) = args.next().map(PathBuf::from) else {
        bail!("usage: steptrack <track.gpx> [speedup]");
    };
    let speedup = args
        .next()
        .map(|value| value.parse::<f64>())
        .transpose()
        .context("speedup must be a number")?;

    let config = load_config().context("failed to load configuration")?;

    let mut provider = GpxReplayProvider::from_file(&track_path)
        .with_context(|| format!("failed to load {}", track_path.display()))?;
    if let Some(rate) = speedup {
        provider = provider.with_speedup(rate);
    }

    let mut tracker = StepTracker::new(config.tracker.clone())
        .with_location(provider)
        .with_profile(&config.profile);

    let session = tracker.start_tracking()?;
    tracker.location_finished().await;

    let Some(summary) = tracker.stop_tracking(session) else {
        bail!("session ended without a summary");
    };

    let (distance, unit) = config.profile.convert_distance(summary.distance_km);
    tracing::info!(
        "{} steps, {:.2} {}, {:.0} kcal",
        summary.steps,
        distance,
        unit,
        summary.estimated_kcal
    );

    println!("{}", summary.to_json()?);

    Ok(())
}
