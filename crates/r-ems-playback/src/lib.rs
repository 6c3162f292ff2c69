//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Timeline playback for simulated asset histories."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Replays simulated asset timelines as a throttled stream of interpolated
//! snapshots, optionally recorded by an external capture backend.

pub mod capture;
pub mod driver;
pub mod errors;
pub mod interpolate;
pub mod scheduler;

pub use capture::{
    backend_from_config, play_with_capture, spawn_capture, CaptureArtifact, CaptureBackend,
    CaptureOutcome, CommandCapture, NullCapture,
};
pub use driver::{PlaybackDriver, PlaybackReport};
pub use errors::{CaptureError, PlaybackError, Result};
pub use interpolate::{interpolate, interpolate_at, interpolate_metrics};
pub use scheduler::{
    PlaybackEvent, PlaybackOptions, PlaybackScheduler, PlaybackSession, PlaybackSnapshot,
    PlaybackState, SessionHandle, TickOutcome,
};
