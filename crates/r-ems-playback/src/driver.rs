//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Timeline playback for simulated asset histories."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::time::Duration;

use r_ems_asset_health::model::TimelineStep;
use r_ems_common::{FrameTimingReporter, JitterSummary};
use r_ems_rt::{Clock, FrameTicker};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    errors::{PlaybackError, Result},
    scheduler::{PlaybackEvent, PlaybackScheduler, PlaybackState, SessionHandle},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackReport {
    pub session_id: u64,
    pub state: PlaybackState,
    pub progress: f64,
    pub frames: u64,
    pub events: u64,
    pub jitter: Option<JitterSummary>,
}

/// Pumps a [`PlaybackScheduler`] from a frame ticker into an event channel.
pub struct PlaybackDriver<C, T> {
    clock: C,
    ticker: T,
    timing: FrameTimingReporter,
}

impl<C: Clock, T: FrameTicker> PlaybackDriver<C, T> {
    pub fn new(clock: C, ticker: T, frame_interval: Duration) -> Self {
        Self {
            clock,
            ticker,
            timing: FrameTimingReporter::new(frame_interval),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn timing(&self) -> &FrameTimingReporter {
        &self.timing
    }

    /// Start a session on `scheduler` at the driver's current time.
    pub fn start(
        &self,
        scheduler: &mut PlaybackScheduler,
        timeline: &[TimelineStep],
        duration: Duration,
    ) -> Result<SessionHandle> {
        scheduler.start(timeline, duration, self.clock.now())
    }

    /// Tick the scheduler's current session until it completes or is
    /// cancelled. A dropped receiver cancels the session.
    pub async fn run(
        &mut self,
        scheduler: &mut PlaybackScheduler,
        events: &mpsc::Sender<PlaybackEvent>,
    ) -> Result<PlaybackReport> {
        let handle = scheduler.handle().ok_or(PlaybackError::NoSession)?;
        let (mut frames, mut sent) = (0u64, 0u64);
        let mut stopped = None;

        'frames: while scheduler.state() == PlaybackState::Running {
            tokio::select! {
                biased;
                _ = handle.cancelled() => {
                    stopped = scheduler.stop();
                    break 'frames;
                }
                _ = self.ticker.tick() => {}
            }

            let now = self.clock.now();
            self.timing.record_frame(now);
            frames += 1;

            for event in scheduler.tick(now).events {
                if events.send(event).await.is_err() {
                    warn!(session = handle.id(), "playback receiver dropped; cancelling session");
                    stopped = scheduler.stop();
                    break 'frames;
                }
                sent += 1;
            }
        }

        let (state, progress) = match &stopped {
            Some(session) => (session.state(), session.progress()),
            None => (scheduler.state(), scheduler.progress()),
        };
        let report = PlaybackReport {
            session_id: handle.id(),
            state,
            progress,
            frames,
            events: sent,
            jitter: self.timing.histogram().summary(),
        };
        debug!(session = report.session_id, state = %report.state, frames, events = sent, "playback loop finished");
        Ok(report)
    }

    /// [`start`](Self::start) followed by [`run`](Self::run).
    pub async fn play(
        &mut self,
        scheduler: &mut PlaybackScheduler,
        timeline: &[TimelineStep],
        duration: Duration,
        events: &mpsc::Sender<PlaybackEvent>,
    ) -> Result<PlaybackReport> {
        self.start(scheduler, timeline, duration)?;
        self.run(scheduler, events).await
    }
}
