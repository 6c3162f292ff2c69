//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Timeline playback for simulated asset histories."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use r_ems_asset_health::model::{numeric, ParamValue, ParameterState, TimelineStep};
use r_ems_playback::{
    interpolate, play_with_capture, CaptureArtifact, CaptureBackend, CaptureError,
    CaptureOutcome, NullCapture, PlaybackDriver, PlaybackEvent, PlaybackOptions,
    PlaybackScheduler, PlaybackState,
};
use r_ems_rt::{Clock, ManualClock, RateLimiter, SteppedTicker, SystemClock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const FRAME: Duration = Duration::from_millis(16);

fn linear_timeline(steps: usize) -> Vec<TimelineStep> {
    (0..steps)
        .map(|i| {
            let x = 100.0 * i as f64 / (steps - 1) as f64;
            let state: ParameterState = [
                ("x".to_string(), ParamValue::Number(x)),
                ("mode".to_string(), ParamValue::from(if i < 2 { "normal" } else { "alarm" })),
            ]
            .into_iter()
            .collect();
            TimelineStep::new(i as f64 * 10.0, state)
        })
        .collect()
}

fn drain(rx: &mut mpsc::Receiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn progress_values(events: &[PlaybackEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|event| match event {
            PlaybackEvent::Progress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect()
}

#[test]
fn interpolating_half_way_through_five_linear_steps() {
    let timeline = linear_timeline(5);
    let state = interpolate(&timeline, 0.5);
    assert!((numeric(&state, "x").unwrap() - 50.0).abs() < 1e-9);
    assert_eq!(interpolate(&timeline, 0.0), timeline[0].state);
    assert_eq!(interpolate(&timeline, 1.0), timeline[4].state);
}

#[tokio::test]
async fn stepped_clock_plays_to_completion() {
    let clock = ManualClock::new();
    let ticker = SteppedTicker::new(clock.clone(), FRAME);
    let mut driver = PlaybackDriver::new(clock.clone(), ticker, FRAME);
    let mut scheduler = PlaybackScheduler::new(PlaybackOptions::default());
    let (tx, mut rx) = mpsc::channel(1024);

    let report = driver
        .play(&mut scheduler, &linear_timeline(5), Duration::from_millis(1000), &tx)
        .await
        .unwrap();
    assert_eq!(report.state, PlaybackState::Completed);
    assert_eq!(report.progress, 1.0);
    // 1000 ms at 16 ms per frame, plus the frame at t = 0
    assert_eq!(report.frames, 64);
    assert_eq!(clock.now(), Duration::from_millis(1008));

    let events = drain(&mut rx);
    assert_eq!(report.events, events.len() as u64);
    let progress = progress_values(&events);
    assert!(progress.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(progress.last(), Some(&1.0));
    assert!(matches!(events.last(), Some(PlaybackEvent::Completed { .. })));

    let snapshots: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            PlaybackEvent::Snapshot(snapshot) => Some(snapshot),
            _ => None,
        })
        .collect();
    // the 50 ms emit interval caps snapshots at about one per three frames
    assert!(snapshots.len() <= 22);
    let last = snapshots.last().unwrap();
    assert_eq!(numeric(&last.state, "x"), Some(100.0));
    assert_eq!(last.state.get("mode"), Some(&ParamValue::from("alarm")));
    assert_eq!(snapshots[0].health_score, 100.0);
    assert!(report.jitter.is_some_and(|jitter| jitter.max_ns == 0.0));
}

#[tokio::test(start_paused = true)]
async fn rate_limited_playback_follows_wall_clock() {
    let clock = SystemClock::new();
    let mut driver = PlaybackDriver::new(clock, RateLimiter::new(FRAME), FRAME);
    let mut scheduler = PlaybackScheduler::default();
    let (tx, mut rx) = mpsc::channel(1024);

    let report = driver
        .play(&mut scheduler, &linear_timeline(3), Duration::from_millis(500), &tx)
        .await
        .unwrap();
    assert_eq!(report.state, PlaybackState::Completed);
    let elapsed = driver.clock().now();
    assert!(elapsed >= Duration::from_millis(500));
    assert!(elapsed < Duration::from_millis(500) + 2 * FRAME);
    assert_eq!(progress_values(&drain(&mut rx)).last(), Some(&1.0));
}

#[tokio::test(start_paused = true)]
async fn cancelling_mid_playback_stops_emissions() {
    let mut driver = PlaybackDriver::new(SystemClock::new(), RateLimiter::new(FRAME), FRAME);
    let mut scheduler = PlaybackScheduler::default();
    let (tx, mut rx) = mpsc::channel(1024);

    let handle = driver
        .start(&mut scheduler, &linear_timeline(5), Duration::from_secs(2))
        .unwrap();
    let canceller = handle.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        canceller.cancel();
    });

    let report = driver.run(&mut scheduler, &tx).await.unwrap();
    assert_eq!(report.state, PlaybackState::Cancelled);
    assert_eq!(report.progress, 0.0);

    let events = drain(&mut rx);
    assert!(!events
        .iter()
        .any(|event| matches!(event, PlaybackEvent::Completed { .. })));
    assert!(progress_values(&events).iter().all(|p| *p < 0.2));
    assert!(scheduler.tick(driver.clock().now()).events.is_empty());
}

#[tokio::test]
async fn back_to_back_sessions_only_emit_for_the_latest() {
    let clock = ManualClock::new();
    let mut driver = PlaybackDriver::new(
        clock.clone(),
        SteppedTicker::new(clock.clone(), FRAME),
        FRAME,
    );
    let mut scheduler = PlaybackScheduler::default();
    let (tx, mut rx) = mpsc::channel(1024);

    let first = driver
        .start(&mut scheduler, &linear_timeline(5), Duration::from_millis(400))
        .unwrap();
    let second = driver
        .start(&mut scheduler, &linear_timeline(3), Duration::from_millis(200))
        .unwrap();
    assert!(first.is_cancelled());

    let report = driver.run(&mut scheduler, &tx).await.unwrap();
    assert_eq!(report.session_id, second.id());
    assert_eq!(report.state, PlaybackState::Completed);
    for event in drain(&mut rx) {
        let session = match event {
            PlaybackEvent::Snapshot(snapshot) => snapshot.session_id,
            PlaybackEvent::Progress { session_id, .. } => session_id,
            PlaybackEvent::Completed { session_id } => session_id,
        };
        assert_eq!(session, second.id());
    }
}

#[tokio::test]
async fn dropped_receiver_cancels_the_session() {
    let clock = ManualClock::new();
    let mut driver = PlaybackDriver::new(
        clock.clone(),
        SteppedTicker::new(clock.clone(), FRAME),
        FRAME,
    );
    let mut scheduler = PlaybackScheduler::default();
    let (tx, rx) = mpsc::channel(8);
    drop(rx);

    let report = driver
        .play(&mut scheduler, &linear_timeline(5), Duration::from_secs(1), &tx)
        .await
        .unwrap();
    assert_eq!(report.state, PlaybackState::Cancelled);
    assert_eq!(report.progress, 0.0);
    assert_eq!(report.events, 0);
}

struct BrokenRecorder;

#[async_trait]
impl CaptureBackend for BrokenRecorder {
    fn name(&self) -> &str {
        "broken"
    }

    async fn capture(
        &self,
        _duration: Duration,
        _cancel: CancellationToken,
    ) -> Result<CaptureArtifact, CaptureError> {
        Err(CaptureError::Exited {
            status: "exit status: 3".into(),
        })
    }
}

/// Ignores cancellation and never finishes on its own.
struct StuckRecorder;

#[async_trait]
impl CaptureBackend for StuckRecorder {
    fn name(&self) -> &str {
        "stuck"
    }

    async fn capture(
        &self,
        _duration: Duration,
        _cancel: CancellationToken,
    ) -> Result<CaptureArtifact, CaptureError> {
        std::future::pending::<()>().await;
        Ok(CaptureArtifact::default())
    }
}

struct InstantRecorder;

#[async_trait]
impl CaptureBackend for InstantRecorder {
    fn name(&self) -> &str {
        "instant"
    }

    async fn capture(
        &self,
        duration: Duration,
        _cancel: CancellationToken,
    ) -> Result<CaptureArtifact, CaptureError> {
        tokio::time::sleep(duration).await;
        Ok(CaptureArtifact {
            path: Some("capture.webm".into()),
            bytes: Some(4096),
        })
    }
}

async fn play_capturing(backend: Arc<dyn CaptureBackend>) -> (PlaybackState, CaptureOutcome) {
    let mut driver = PlaybackDriver::new(SystemClock::new(), RateLimiter::new(FRAME), FRAME);
    let mut scheduler = PlaybackScheduler::default();
    let (tx, _rx) = mpsc::channel(1024);
    let (report, outcome) = play_with_capture(
        &mut driver,
        &mut scheduler,
        &linear_timeline(4),
        Duration::from_millis(300),
        backend,
        Duration::from_millis(200),
        &tx,
    )
    .await
    .unwrap();
    (report.state, outcome)
}

#[tokio::test(start_paused = true)]
async fn capture_failures_never_block_playback() {
    for backend in [
        Arc::new(NullCapture) as Arc<dyn CaptureBackend>,
        Arc::new(BrokenRecorder),
        Arc::new(StuckRecorder),
    ] {
        let name = backend.name().to_owned();
        let (state, outcome) = play_capturing(backend).await;
        assert_eq!(state, PlaybackState::Completed, "{name}");
        match outcome {
            CaptureOutcome::Fallback { backend, .. } => assert_eq!(backend, name),
            other => panic!("{name}: expected fallback, got {other:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn stuck_capture_times_out_after_grace() {
    let started = tokio::time::Instant::now();
    let (_, outcome) = play_capturing(Arc::new(StuckRecorder)).await;
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(500));
    assert!(waited < Duration::from_millis(510));
    match outcome {
        CaptureOutcome::Fallback { reason, .. } => assert!(reason.contains("did not finish")),
        other => panic!("expected timeout fallback, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn successful_capture_reports_its_artifact() {
    let (state, outcome) = play_capturing(Arc::new(InstantRecorder)).await;
    assert_eq!(state, PlaybackState::Completed);
    assert_eq!(
        outcome,
        CaptureOutcome::Captured(CaptureArtifact {
            path: Some("capture.webm".into()),
            bytes: Some(4096),
        })
    );
}
