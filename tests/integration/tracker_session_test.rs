//! Tracking session lifecycle against simulated sensor providers.

use std::time::Duration;
use steptrack::sensors::{
    AccelerometerSample, ChannelLocationProvider, ChannelMotionProvider, LocationError,
    LocationFeed, MotionFeed, SimulatedAccess, SubscriptionState, TrackingSample,
};
use steptrack::tracking::{SessionEnd, StepSource, StepTracker, TrackerError, TrackerState};
use steptrack::TrackerSettings;
use tokio::sync::watch;

/// Latitude exactly `meters` north of the equator on the haversine sphere.
fn north(meters: f64) -> f64 {
    (meters / 6_371_000.0).to_degrees()
}

fn fix(meters_north: f64) -> TrackingSample {
    TrackingSample::new(north(meters_north), 0.0, 5.0)
}

fn gps_tracker() -> (StepTracker, LocationFeed) {
    let (location, feed) = ChannelLocationProvider::new();
    (StepTracker::with_defaults().with_location(location), feed)
}

fn full_tracker(settings: TrackerSettings) -> (StepTracker, LocationFeed, MotionFeed) {
    let (location, location_feed) = ChannelLocationProvider::new();
    let (motion, motion_feed) = ChannelMotionProvider::new();
    let tracker = StepTracker::new(settings)
        .with_location(location)
        .with_motion(motion);
    (tracker, location_feed, motion_feed)
}

/// Push a fix and wait until the tracker has applied it.
async fn push_fix(
    feed: &LocationFeed,
    rx: &mut watch::Receiver<TrackerState>,
    sample: TrackingSample,
) -> TrackerState {
    assert!(feed.push(sample).await, "no live location watch");
    tokio::time::timeout(Duration::from_secs(1), rx.changed())
        .await
        .expect("tracker did not apply fix")
        .expect("tracker dropped");
    rx.borrow_and_update().clone()
}

async fn wait_for(
    rx: &mut watch::Receiver<TrackerState>,
    predicate: impl FnMut(&TrackerState) -> bool,
) -> TrackerState {
    tokio::time::timeout(Duration::from_secs(1), rx.wait_for(predicate))
        .await
        .expect("state never matched")
        .expect("tracker dropped")
        .clone()
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_start_sets_tracking_and_clears_error() {
    let (location, feed) = ChannelLocationProvider::new();
    let mut tracker = StepTracker::with_defaults().with_location(location);

    let session = tracker.start_tracking().unwrap();
    let state = tracker.state();

    assert!(state.is_tracking);
    assert!(state.error.is_none());
    assert_eq!(feed.watch_count(), 1);

    let options = feed.last_options().unwrap();
    assert!(options.enable_high_accuracy);
    assert_eq!(options.maximum_age_ms, 0);

    tracker.stop_tracking(session);
}

#[tokio::test]
async fn test_one_kilometer_gps_only() {
    let (mut tracker, feed) = gps_tracker();
    let mut rx = tracker.subscribe();
    let session = tracker.start_tracking().unwrap();
    rx.borrow_and_update();

    let state = push_fix(&feed, &mut rx, fix(0.0)).await;
    assert_eq!(state.steps, 0);
    assert_eq!(state.distance_km, 0.0);
    assert!(state.last_position.is_some());

    let state = push_fix(&feed, &mut rx, fix(1000.0)).await;
    assert_eq!(state.steps, 1429);
    assert!((state.distance_km - 1.0).abs() < 1e-9);

    let summary = tracker.stop_tracking(session).unwrap();
    assert_eq!(summary.steps, 1429);
    assert_eq!(summary.end, SessionEnd::Stopped);
    assert!(!summary.accelerometer_used);
}

#[tokio::test]
async fn test_accelerometer_threshold_scenario() {
    let (mut tracker, _location_feed, motion_feed) = full_tracker(TrackerSettings::default());
    let mut rx = tracker.subscribe();
    let session = tracker.start_tracking().unwrap();

    for magnitude in [0.5, 1.3, 0.4, 1.5] {
        assert!(motion_feed.push(AccelerometerSample::vertical(magnitude)).await);
    }

    let state = wait_for(&mut rx, |s| s.steps >= 2).await;
    assert_eq!(state.steps, 2);

    tracker.stop_tracking(session);
}

#[tokio::test]
async fn test_accelerometer_is_authoritative_when_live() {
    let (mut tracker, location_feed, motion_feed) = full_tracker(TrackerSettings::default());
    let mut rx = tracker.subscribe();
    let session = tracker.start_tracking().unwrap();
    rx.borrow_and_update();

    push_fix(&location_feed, &mut rx, fix(0.0)).await;
    let state = push_fix(&location_feed, &mut rx, fix(700.0)).await;
    assert_eq!(state.steps, 0);
    assert!((state.distance_km - 0.7).abs() < 1e-9);

    motion_feed.push(AccelerometerSample::vertical(1.6)).await;
    let state = wait_for(&mut rx, |s| s.steps >= 1).await;
    assert_eq!(state.steps, 1);

    tracker.stop_tracking(session);
}

#[tokio::test]
async fn test_additive_policy_double_counts() {
    let settings = TrackerSettings {
        step_source: StepSource::Additive,
        ..Default::default()
    };
    let (mut tracker, location_feed, motion_feed) = full_tracker(settings);
    let mut rx = tracker.subscribe();
    let session = tracker.start_tracking().unwrap();
    rx.borrow_and_update();

    push_fix(&location_feed, &mut rx, fix(0.0)).await;
    push_fix(&location_feed, &mut rx, fix(7.0)).await;
    motion_feed.push(AccelerometerSample::vertical(1.6)).await;

    let state = wait_for(&mut rx, |s| s.steps >= 11).await;
    assert_eq!(state.steps, 11);

    tracker.stop_tracking(session);
}

#[tokio::test]
async fn test_gps_steps_resume_when_accelerometer_stream_closes() {
    let (mut tracker, location_feed, motion_feed) = full_tracker(TrackerSettings::default());
    let mut rx = tracker.subscribe();
    let session = tracker.start_tracking().unwrap();
    rx.borrow_and_update();

    motion_feed.close();
    for _ in 0..20 {
        if tracker.sensor_status().accelerometer == SubscriptionState::Failed {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(
        tracker.sensor_status().accelerometer,
        SubscriptionState::Failed
    );
    assert!(tracker.state().is_tracking);

    push_fix(&location_feed, &mut rx, fix(0.0)).await;
    let state = push_fix(&location_feed, &mut rx, fix(70.0)).await;
    assert_eq!(state.steps, 100);

    tracker.stop_tracking(session);
}

#[tokio::test]
async fn test_denied_accelerometer_degrades_to_gps_only() {
    let (location, location_feed) = ChannelLocationProvider::new();
    let (motion, motion_feed) = ChannelMotionProvider::with_access(SimulatedAccess::Denied);
    let mut tracker = StepTracker::with_defaults()
        .with_location(location)
        .with_motion(motion);
    let mut rx = tracker.subscribe();

    let session = tracker.start_tracking().unwrap();
    rx.borrow_and_update();
    let state = tracker.state();
    assert!(state.is_tracking);
    assert!(state.error.is_none());
    assert!(!motion_feed.is_streaming());

    push_fix(&location_feed, &mut rx, fix(0.0)).await;
    let state = push_fix(&location_feed, &mut rx, fix(70.0)).await;
    assert_eq!(state.steps, 100);

    tracker.stop_tracking(session);
}

#[tokio::test]
async fn test_start_without_geolocation() {
    let mut tracker = StepTracker::with_defaults();

    let err = tracker.start_tracking().unwrap_err();
    assert_eq!(err, TrackerError::Location(LocationError::Unsupported));

    let state = tracker.state();
    assert!(!state.is_tracking);
    assert!(state.error.is_some());
}

#[tokio::test]
async fn test_start_with_permission_denied() {
    let (location, _feed) = ChannelLocationProvider::with_access(SimulatedAccess::Denied);
    let mut tracker = StepTracker::with_defaults().with_location(location);

    assert!(tracker.start_tracking().is_err());

    let state = tracker.state();
    assert!(!state.is_tracking);
    assert_eq!(state.error.as_deref(), Some("Location permission denied"));
    assert_eq!(
        tracker.sensor_status().location,
        SubscriptionState::Failed
    );
}

#[tokio::test]
async fn test_location_error_ends_session() {
    let (mut tracker, location_feed, motion_feed) = full_tracker(TrackerSettings::default());
    let mut rx = tracker.subscribe();
    let session = tracker.start_tracking().unwrap();

    assert!(location_feed.fail(LocationError::Timeout).await);
    let state = wait_for(&mut rx, |s| !s.is_tracking).await;
    assert_eq!(
        state.error.as_deref(),
        Some("Timed out waiting for a location fix")
    );

    settle().await;
    assert!(!location_feed.is_watching());
    assert!(!motion_feed.is_streaming());

    let summary = tracker.stop_tracking(session).unwrap();
    assert_eq!(
        summary.end,
        SessionEnd::LocationError("Timed out waiting for a location fix".to_string())
    );
}

#[tokio::test]
async fn test_retry_after_error_clears_it() {
    let (mut tracker, feed) = gps_tracker();
    let mut rx = tracker.subscribe();
    let session = tracker.start_tracking().unwrap();

    feed.fail(LocationError::PositionUnavailable("no satellites".to_string()))
        .await;
    wait_for(&mut rx, |s| !s.is_tracking).await;
    tracker.stop_tracking(session);

    let session = tracker.start_tracking().unwrap();
    let state = tracker.state();
    assert!(state.is_tracking);
    assert!(state.error.is_none());
    assert_eq!(feed.watch_count(), 2);

    tracker.stop_tracking(session);
}

#[tokio::test]
async fn test_reset_keeps_tracking_and_rebaselines() {
    let (mut tracker, feed) = gps_tracker();
    let mut rx = tracker.subscribe();
    let session = tracker.start_tracking().unwrap();
    rx.borrow_and_update();

    push_fix(&feed, &mut rx, fix(0.0)).await;
    push_fix(&feed, &mut rx, fix(70.0)).await;

    tracker.reset_steps();
    let state = tracker.state();
    assert_eq!(state.steps, 0);
    assert_eq!(state.distance_km, 0.0);
    assert!(state.is_tracking);
    rx.borrow_and_update();

    // First fix after reset is only a baseline, even though it is far away
    let state = push_fix(&feed, &mut rx, fix(5000.0)).await;
    assert_eq!(state.steps, 0);
    assert_eq!(state.distance_km, 0.0);

    let state = push_fix(&feed, &mut rx, fix(5070.0)).await;
    assert_eq!(state.steps, 100);

    let summary = tracker.stop_tracking(session).unwrap();
    assert_eq!(summary.steps, 100);
}

#[tokio::test]
async fn test_reset_while_idle() {
    let (mut tracker, feed) = gps_tracker();
    let mut rx = tracker.subscribe();
    let session = tracker.start_tracking().unwrap();
    rx.borrow_and_update();
    push_fix(&feed, &mut rx, fix(0.0)).await;
    push_fix(&feed, &mut rx, fix(70.0)).await;
    tracker.stop_tracking(session);

    tracker.reset_steps();
    let state = tracker.state();
    assert_eq!(state.steps, 0);
    assert!(!state.is_tracking);
}

#[tokio::test]
async fn test_stop_keeps_counters() {
    let (mut tracker, feed) = gps_tracker();
    let mut rx = tracker.subscribe();
    let session = tracker.start_tracking().unwrap();
    rx.borrow_and_update();

    push_fix(&feed, &mut rx, fix(0.0)).await;
    push_fix(&feed, &mut rx, fix(70.0)).await;
    tracker.stop_tracking(session);

    let state = tracker.state();
    assert!(!state.is_tracking);
    assert_eq!(state.steps, 100);
    assert!(state.last_position.is_some());
}

#[tokio::test]
async fn test_no_mutation_after_stop() {
    let (mut tracker, location_feed, motion_feed) = full_tracker(TrackerSettings {
        step_source: StepSource::Additive,
        ..Default::default()
    });
    let mut rx = tracker.subscribe();
    let session = tracker.start_tracking().unwrap();
    rx.borrow_and_update();
    push_fix(&location_feed, &mut rx, fix(0.0)).await;

    // Queue samples that the pump tasks have not applied yet
    location_feed.push(fix(700.0)).await;
    motion_feed.push(AccelerometerSample::vertical(2.0)).await;

    tracker.stop_tracking(session);
    let at_stop = tracker.state();

    location_feed.push(fix(1400.0)).await;
    motion_feed.push(AccelerometerSample::vertical(2.0)).await;
    settle().await;

    assert_eq!(tracker.state(), at_stop);
    assert!(!location_feed.is_watching());
    assert!(!motion_feed.is_streaming());
}

#[tokio::test]
async fn test_stop_when_idle_or_stale_is_noop() {
    let (mut tracker, feed) = gps_tracker();
    let mut rx = tracker.subscribe();

    let first = tracker.start_tracking().unwrap();
    assert!(tracker.stop_tracking(first).is_some());

    let second = tracker.start_tracking().unwrap();
    rx.borrow_and_update();
    push_fix(&feed, &mut rx, fix(0.0)).await;

    let summary = tracker.shutdown().unwrap();
    assert_eq!(summary.session_id, second.id());

    // The handle outlived its session
    assert!(tracker.stop_tracking(second).is_none());
    assert!(!tracker.state().is_tracking);
}

#[tokio::test]
async fn test_restart_rebaselines_but_keeps_counters() {
    let (mut tracker, feed) = gps_tracker();
    let mut rx = tracker.subscribe();

    let session = tracker.start_tracking().unwrap();
    rx.borrow_and_update();
    push_fix(&feed, &mut rx, fix(0.0)).await;
    push_fix(&feed, &mut rx, fix(70.0)).await;
    tracker.stop_tracking(session);

    let session = tracker.start_tracking().unwrap();
    rx.borrow_and_update();
    let state = push_fix(&feed, &mut rx, fix(1000.0)).await;
    assert_eq!(state.steps, 100);

    let state = push_fix(&feed, &mut rx, fix(1070.0)).await;
    assert_eq!(state.steps, 200);

    let summary = tracker.stop_tracking(session).unwrap();
    assert_eq!(summary.steps, 100);
    assert!((summary.distance_km - 0.07).abs() < 1e-9);
}

#[tokio::test]
async fn test_negative_threshold_never_starts_a_session() {
    let (mut tracker, location_feed, motion_feed) = full_tracker(TrackerSettings {
        accel_threshold: -1.0,
        ..Default::default()
    });

    let error = tracker.start_tracking().unwrap_err();
    assert!(matches!(error, TrackerError::InvalidSettings(_)));
    assert!(!location_feed.is_watching());
    assert!(!motion_feed.is_streaming());

    // Nothing is subscribed, so still readings cannot count as steps.
    for _ in 0..5 {
        assert!(!motion_feed.push(AccelerometerSample::new(0.0, 0.0, 0.0)).await);
    }
    settle().await;

    let state = tracker.state();
    assert_eq!(state.steps, 0);
    assert!(!state.is_tracking);
    assert!(state.error.unwrap().contains("accel_threshold"));
}
