//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Operator CLI for asset health analysis and timeline playback."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use r_ems_asset_health::io::load_record_from_file;
use r_ems_asset_health::model::SimulationRecord;
use r_ems_common::AppConfig;
use r_ems_playback::{
    backend_from_config, spawn_capture, CaptureOutcome, PlaybackDriver, PlaybackEvent,
    PlaybackOptions, PlaybackReport, PlaybackScheduler,
};
use r_ems_rt::{Clock, FrameTicker, ManualClock, RateLimiter, SteppedTicker, SystemClock};
use serde_json::json;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Args)]
pub struct PlaybackCommand {
    /// Simulation record file (JSON or YAML).
    #[arg(value_name = "FILE")]
    record: PathBuf,

    /// Playback duration in milliseconds (defaults to `playback.duration_ms`).
    #[arg(long = "duration-ms", value_name = "MS")]
    duration_ms: Option<u64>,

    /// Step a simulated clock one frame at a time instead of waiting on wall time.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    simulated: bool,

    /// Record the playback with the configured capture backend.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    capture: bool,

    /// Write the run report as JSON to this file.
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

impl PlaybackCommand {
    pub async fn execute(self, config: &AppConfig) -> Result<()> {
        let record = load_record_from_file(&self.record)
            .with_context(|| format!("unable to load record {}", self.record.display()))?;
        let duration = self
            .duration_ms
            .map(Duration::from_millis)
            .unwrap_or(config.playback.duration);
        let frame = config.playback.frame_interval;

        let (report, capture) = if self.simulated {
            let clock = ManualClock::new();
            let ticker = SteppedTicker::new(clock.clone(), frame);
            let driver = PlaybackDriver::new(clock, ticker, frame);
            self.drive(driver, config, &record, duration).await?
        } else {
            let driver = PlaybackDriver::new(SystemClock::new(), RateLimiter::new(frame), frame);
            self.drive(driver, config, &record, duration).await?
        };

        info!(
            session = report.session_id,
            state = %report.state,
            frames = report.frames,
            events = report.events,
            "playback finished"
        );
        if let Some(path) = &self.report {
            let body = serde_json::to_vec_pretty(&json!({
                "playback": report,
                "capture": capture,
            }))?;
            fs::write(path, body)
                .with_context(|| format!("unable to write playback report {}", path.display()))?;
        }
        Ok(())
    }

    async fn drive<C: Clock, T: FrameTicker>(
        &self,
        mut driver: PlaybackDriver<C, T>,
        config: &AppConfig,
        record: &SimulationRecord,
        duration: Duration,
    ) -> Result<(PlaybackReport, Option<CaptureOutcome>)> {
        let mut scheduler = PlaybackScheduler::new(PlaybackOptions::from(&config.playback));
        let handle = driver
            .start(&mut scheduler, &record.timeline, duration)
            .context("record timeline cannot be played")?;

        let interrupt = handle.clone();
        let ctrl_c = tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                warn!(session = interrupt.id(), "interrupted; cancelling playback");
                interrupt.cancel();
            }
        });

        let capture = self.capture.then(|| {
            spawn_capture(
                backend_from_config(&config.capture),
                duration,
                config.capture.grace,
                handle.child_token(),
            )
        });

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let writer = tokio::spawn(write_events(rx));
        let report = driver.run(&mut scheduler, &tx).await;
        drop(tx);
        ctrl_c.abort();
        let written = writer.await.context("event writer task failed")??;
        let report = report?;
        if written != report.events {
            warn!(written, sent = report.events, "not every playback event reached stdout");
        }

        let capture = match capture {
            Some(task) => Some(task.await.context("capture task failed")?),
            None => None,
        };
        Ok((report, capture))
    }
}

/// Stream events to stdout as JSON Lines until the sender side closes.
async fn write_events(mut rx: mpsc::Receiver<PlaybackEvent>) -> Result<u64> {
    let mut written = 0u64;
    while let Some(event) = rx.recv().await {
        let line = serde_json::to_string(&event)?;
        let stdout = io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "{line}")?;
        out.flush()?;
        written += 1;
    }
    Ok(written)
}
