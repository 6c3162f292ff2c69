//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared configuration, logging and frame timing for the asset twin."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Core shared primitives for the R-EMS asset twin workspace.
//! This crate exposes configuration loading, logging, and frame timing
//! utilities consumed across the workspace.

pub mod config;
pub mod logging;
pub mod metrics;

pub use config::{
    AnalyticsConfig, AppConfig, CaptureConfig, LoadedAppConfig, LoggingConfig, PlaybackConfig,
};
pub use logging::{init_tracing, LogFormat};
pub use metrics::{FrameTimingReporter, JitterHistogram, JitterSummary};
