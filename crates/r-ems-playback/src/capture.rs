//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Timeline playback for simulated asset histories."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Bounded recording alongside playback.
//!
//! A capture runs as its own task for the playback duration. The playback
//! loop never waits on it, and any capture failure is logged and reported as
//! [`CaptureOutcome::Fallback`] instead of an error.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use r_ems_asset_health::model::TimelineStep;
use r_ems_common::CaptureConfig;
use r_ems_rt::{Clock, FrameTicker};
use serde::Serialize;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    driver::{PlaybackDriver, PlaybackReport},
    errors::{CaptureError, Result},
    scheduler::{PlaybackEvent, PlaybackScheduler},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureArtifact {
    pub path: Option<PathBuf>,
    pub bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CaptureOutcome {
    Captured(CaptureArtifact),
    Fallback { backend: String, reason: String },
}

impl CaptureOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, CaptureOutcome::Fallback { .. })
    }
}

#[async_trait]
pub trait CaptureBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Record for `duration`, stopping early when `cancel` fires.
    async fn capture(
        &self,
        duration: Duration,
        cancel: CancellationToken,
    ) -> std::result::Result<CaptureArtifact, CaptureError>;
}

/// Stand-in when no recorder is configured. Every capture falls back.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCapture;

#[async_trait]
impl CaptureBackend for NullCapture {
    fn name(&self) -> &str {
        "none"
    }

    async fn capture(
        &self,
        _duration: Duration,
        _cancel: CancellationToken,
    ) -> std::result::Result<CaptureArtifact, CaptureError> {
        Err(CaptureError::Unavailable)
    }
}

/// Runs an external recorder. The process receives `args`, then the output
/// path when configured, then the duration in milliseconds.
#[derive(Debug, Clone)]
pub struct CommandCapture {
    program: PathBuf,
    args: Vec<String>,
    output: Option<PathBuf>,
}

impl CommandCapture {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            output: None,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }
}

#[async_trait]
impl CaptureBackend for CommandCapture {
    fn name(&self) -> &str {
        "command"
    }

    async fn capture(
        &self,
        duration: Duration,
        cancel: CancellationToken,
    ) -> std::result::Result<CaptureArtifact, CaptureError> {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(output) = &self.output {
            command.arg(output);
        }
        command
            .arg(duration.as_millis().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(CaptureError::Spawn)?;
        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel.cancelled() => {
                child.kill().await?;
                return Err(CaptureError::Cancelled);
            }
        };
        if !status.success() {
            return Err(CaptureError::Exited {
                status: status.to_string(),
            });
        }

        let bytes = match &self.output {
            Some(path) => tokio::fs::metadata(path).await.ok().map(|meta| meta.len()),
            None => None,
        };
        Ok(CaptureArtifact {
            path: self.output.clone(),
            bytes,
        })
    }
}

/// Backend described by `config`, or [`NullCapture`] when capture is off.
pub fn backend_from_config(config: &CaptureConfig) -> Arc<dyn CaptureBackend> {
    match (&config.command, config.enabled) {
        (Some(program), true) => {
            let mut backend = CommandCapture::new(program).with_args(config.args.iter().cloned());
            if let Some(output) = &config.output {
                backend = backend.with_output(output);
            }
            Arc::new(backend)
        }
        _ => Arc::new(NullCapture),
    }
}

/// Run `backend` on its own task, bounded by `duration + grace`.
pub fn spawn_capture(
    backend: Arc<dyn CaptureBackend>,
    duration: Duration,
    grace: Duration,
    cancel: CancellationToken,
) -> JoinHandle<CaptureOutcome> {
    tokio::spawn(async move {
        let limit = duration.saturating_add(grace);
        let result = match tokio::time::timeout(limit, backend.capture(duration, cancel)).await {
            Ok(result) => result,
            Err(_) => Err(CaptureError::TimedOut(limit)),
        };
        match result {
            Ok(artifact) => {
                info!(backend = backend.name(), path = ?artifact.path, "capture finished");
                CaptureOutcome::Captured(artifact)
            }
            Err(err) => {
                warn!(backend = backend.name(), error = %err, "capture failed; continuing without recording");
                CaptureOutcome::Fallback {
                    backend: backend.name().to_owned(),
                    reason: err.to_string(),
                }
            }
        }
    })
}

/// Play `timeline` while `backend` records. Capture is tied to the session:
/// cancelling playback cancels the recording as well.
pub async fn play_with_capture<C: Clock, T: FrameTicker>(
    driver: &mut PlaybackDriver<C, T>,
    scheduler: &mut PlaybackScheduler,
    timeline: &[TimelineStep],
    duration: Duration,
    backend: Arc<dyn CaptureBackend>,
    grace: Duration,
    events: &mpsc::Sender<PlaybackEvent>,
) -> Result<(PlaybackReport, CaptureOutcome)> {
    let handle = driver.start(scheduler, timeline, duration)?;
    let name = backend.name().to_owned();
    let capture = spawn_capture(backend, duration, grace, handle.child_token());
    let report = driver.run(scheduler, events).await?;
    let outcome = match capture.await {
        Ok(outcome) => outcome,
        Err(err) => {
            let err = CaptureError::Task(err.to_string());
            warn!(backend = %name, error = %err, "capture task failed");
            CaptureOutcome::Fallback {
                backend: name,
                reason: err.to_string(),
            }
        }
    };
    Ok((report, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_capture_falls_back() {
        let outcome = spawn_capture(
            Arc::new(NullCapture),
            Duration::from_millis(10),
            Duration::from_millis(10),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(outcome.is_fallback());
    }

    #[tokio::test]
    async fn missing_program_falls_back() {
        let backend = CommandCapture::new("/nonexistent/r-ems-recorder");
        let outcome = spawn_capture(
            Arc::new(backend),
            Duration::from_millis(10),
            Duration::from_secs(1),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        match outcome {
            CaptureOutcome::Fallback { backend, reason } => {
                assert_eq!(backend, "command");
                assert!(reason.contains("launch"));
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn disabled_config_uses_null_backend() {
        let config = CaptureConfig {
            command: Some(PathBuf::from("recorder")),
            ..CaptureConfig::default()
        };
        assert_eq!(backend_from_config(&config).name(), "none");
        let enabled = CaptureConfig {
            enabled: true,
            ..config
        };
        assert_eq!(backend_from_config(&enabled).name(), "command");
    }
}
