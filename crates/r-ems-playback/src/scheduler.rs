//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Timeline playback for simulated asset histories."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Frame-driven playback sessions.
//!
//! A session replays a baseline frame followed by every timeline step over a
//! fixed wall-clock duration. [`PlaybackSession::tick`] is a pure transition
//! from the current time to the events due at that time, so any clock can
//! drive it. Snapshots are throttled: one is emitted only when the bracketing
//! frames or the blend ratio changed noticeably and the emit interval has
//! elapsed since the previous emission. The completing tick always emits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use r_ems_asset_health::model::{validate_timeline, HealthMetrics, ParameterState, TimelineStep};
use r_ems_common::PlaybackConfig;
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    errors::Result,
    interpolate::{blend_metrics, blend_states},
};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl PlaybackState {
    pub fn is_finished(&self) -> bool {
        matches!(self, PlaybackState::Completed | PlaybackState::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    pub emit_interval: Duration,
    pub mix_epsilon: f64,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            emit_interval: Duration::from_millis(50),
            mix_epsilon: 0.001,
        }
    }
}

impl From<&PlaybackConfig> for PlaybackOptions {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            emit_interval: config.emit_interval,
            mix_epsilon: config.mix_epsilon,
        }
    }
}

/// One playable frame: the baseline or a timeline step.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackFrame {
    pub state: ParameterState,
    pub metrics: HealthMetrics,
    pub health_score: f64,
}

impl PlaybackFrame {
    /// Ideal condition with the parameters of the first step.
    pub fn baseline(first: &TimelineStep) -> Self {
        Self {
            state: first.state.clone(),
            metrics: HealthMetrics::BASELINE,
            health_score: HealthMetrics::BASELINE.true_health,
        }
    }

    pub fn from_step(step: &TimelineStep) -> Self {
        let metrics = step.metrics();
        Self {
            state: step.state.clone(),
            metrics,
            health_score: step
                .health_score
                .filter(|score| score.is_finite())
                .unwrap_or(metrics.true_health),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub session_id: u64,
    pub progress: f64,
    pub lower: usize,
    pub upper: usize,
    pub mix: f64,
    pub playback_state: PlaybackState,
    pub state: ParameterState,
    pub metrics: HealthMetrics,
    pub health_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PlaybackEvent {
    Snapshot(PlaybackSnapshot),
    Progress { session_id: u64, progress: f64 },
    Completed { session_id: u64 },
}

/// Events due at one tick and the session state afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub events: Vec<PlaybackEvent>,
    pub state: PlaybackState,
}

impl TickOutcome {
    fn quiet(state: PlaybackState) -> Self {
        Self {
            events: Vec::new(),
            state,
        }
    }
}

/// Caller's view of a started session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: u64,
    token: CancellationToken,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the session is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Token cancelled together with the session, for companion tasks.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}

#[derive(Debug)]
pub struct PlaybackSession {
    id: u64,
    frames: Vec<PlaybackFrame>,
    origin: Duration,
    duration: Duration,
    options: PlaybackOptions,
    token: CancellationToken,
    state: PlaybackState,
    progress: f64,
    reported_progress: Option<f64>,
    last_emit: Option<Duration>,
    last_bracket: Option<(usize, usize)>,
    last_mix: f64,
}

impl PlaybackSession {
    /// Session starting at `origin` on the driving clock.
    pub fn new(
        timeline: &[TimelineStep],
        duration: Duration,
        origin: Duration,
        options: PlaybackOptions,
    ) -> Result<Self> {
        validate_timeline(timeline)?;
        let mut frames = Vec::with_capacity(timeline.len() + 1);
        frames.push(PlaybackFrame::baseline(&timeline[0]));
        frames.extend(timeline.iter().map(PlaybackFrame::from_step));
        Ok(Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            frames,
            origin,
            duration,
            options,
            token: CancellationToken::new(),
            state: PlaybackState::Running,
            progress: 0.0,
            reported_progress: None,
            last_emit: None,
            last_bracket: None,
            last_mix: 0.0,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            id: self.id,
            token: self.token.clone(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn frames(&self) -> &[PlaybackFrame] {
        &self.frames
    }

    /// Cancel a running session. Progress of a cancelled session reads 0.
    pub fn cancel(&mut self) {
        self.token.cancel();
        if self.state == PlaybackState::Running {
            info!(session = self.id, reached = self.progress, "playback cancelled");
            self.state = PlaybackState::Cancelled;
            self.progress = 0.0;
        }
    }

    /// Frame position for `progress`: bracketing indices and blend ratio.
    pub fn position(&self, progress: f64) -> (usize, usize, f64) {
        let last = self.frames.len() - 1;
        let index = progress.clamp(0.0, 1.0) * last as f64;
        let lower = (index.floor() as usize).min(last);
        let upper = (lower + 1).min(last);
        let mix = if upper == lower {
            0.0
        } else {
            (index - lower as f64).clamp(0.0, 1.0)
        };
        (lower, upper, mix)
    }

    fn snapshot(&self, progress: f64, lower: usize, upper: usize, mix: f64) -> PlaybackSnapshot {
        let (a, b) = (&self.frames[lower], &self.frames[upper]);
        PlaybackSnapshot {
            session_id: self.id,
            progress,
            lower,
            upper,
            mix,
            playback_state: self.state,
            state: blend_states(&a.state, &b.state, mix),
            metrics: blend_metrics(a.metrics, b.metrics, mix),
            health_score: a.health_score + (b.health_score - a.health_score) * mix,
        }
    }

    /// Advance the session to `now` and return the events due.
    pub fn tick(&mut self, now: Duration) -> TickOutcome {
        if self.state == PlaybackState::Running && self.token.is_cancelled() {
            self.cancel();
        }
        if self.state != PlaybackState::Running {
            return TickOutcome::quiet(self.state);
        }

        let elapsed = now.saturating_sub(self.origin);
        let raw = if self.duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
        };
        let progress = raw.max(self.progress);
        self.progress = progress;

        if progress >= 1.0 {
            self.state = PlaybackState::Completed;
            self.progress = 1.0;
            let last = self.frames.len() - 1;
            let snapshot = self.snapshot(1.0, last, last, 0.0);
            self.last_emit = Some(now);
            self.last_bracket = Some((last, last));
            self.reported_progress = Some(1.0);
            info!(session = self.id, frames = self.frames.len(), "playback completed");
            return TickOutcome {
                events: vec![
                    PlaybackEvent::Snapshot(snapshot),
                    PlaybackEvent::Progress {
                        session_id: self.id,
                        progress: 1.0,
                    },
                    PlaybackEvent::Completed { session_id: self.id },
                ],
                state: self.state,
            };
        }

        let due = self
            .last_emit
            .map_or(true, |at| now.saturating_sub(at) >= self.options.emit_interval);
        if !due {
            return TickOutcome::quiet(self.state);
        }

        let (lower, upper, mix) = self.position(progress);
        let moved = self.last_bracket != Some((lower, upper))
            || (mix - self.last_mix).abs() > self.options.mix_epsilon;
        let mut events = Vec::with_capacity(2);
        if moved {
            debug!(session = self.id, progress, lower, upper, mix, "emitting snapshot");
            events.push(PlaybackEvent::Snapshot(self.snapshot(progress, lower, upper, mix)));
            self.last_bracket = Some((lower, upper));
            self.last_mix = mix;
        }
        if self.reported_progress.map_or(true, |reported| progress > reported) {
            events.push(PlaybackEvent::Progress {
                session_id: self.id,
                progress,
            });
            self.reported_progress = Some(progress);
        }
        if !events.is_empty() {
            self.last_emit = Some(now);
        }
        TickOutcome {
            events,
            state: self.state,
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Owns the single playback session of one viewer.
#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    options: PlaybackOptions,
    session: Option<PlaybackSession>,
}

impl PlaybackScheduler {
    pub fn new(options: PlaybackOptions) -> Self {
        Self {
            options,
            session: None,
        }
    }

    /// Start playing `timeline` over `duration`, measured from `now`. A
    /// session already in place is cancelled and dropped first.
    pub fn start(
        &mut self,
        timeline: &[TimelineStep],
        duration: Duration,
        now: Duration,
    ) -> Result<SessionHandle> {
        let session = PlaybackSession::new(timeline, duration, now, self.options)?;
        if let Some(mut previous) = self.session.take() {
            previous.cancel();
        }
        let handle = session.handle();
        info!(session = session.id(), frames = session.frames().len(), duration_ms = duration.as_millis() as u64, "playback started");
        self.session = Some(session);
        Ok(handle)
    }

    pub fn tick(&mut self, now: Duration) -> TickOutcome {
        match self.session.as_mut() {
            Some(session) => session.tick(now),
            None => TickOutcome::quiet(PlaybackState::Idle),
        }
    }

    /// Cancel the current session and release it. The stopped session is
    /// handed back so callers can read its final state.
    pub fn stop(&mut self) -> Option<PlaybackSession> {
        let mut session = self.session.take()?;
        session.cancel();
        Some(session)
    }

    pub fn state(&self) -> PlaybackState {
        self.session
            .as_ref()
            .map_or(PlaybackState::Idle, PlaybackSession::state)
    }

    pub fn progress(&self) -> f64 {
        self.session.as_ref().map_or(0.0, PlaybackSession::progress)
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn handle(&self) -> Option<SessionHandle> {
        self.session.as_ref().map(PlaybackSession::handle)
    }
}
