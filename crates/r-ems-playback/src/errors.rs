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

use r_ems_asset_health::AnalyticsError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlaybackError>;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("invalid timeline: {0}")]
    InvalidTimeline(#[from] AnalyticsError),
    #[error("no playback session is running")]
    NoSession,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no capture backend is available")]
    Unavailable,
    #[error("failed to launch capture process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("capture process failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("capture process exited with {status}")]
    Exited { status: String },
    #[error("capture did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("capture cancelled")]
    Cancelled,
    #[error("capture task failed: {0}")]
    Task(String),
}
