//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Configuration loading and tracing setup for the asset twin."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_file_logging() -> bool {
    true
}

fn default_max_insights() -> usize {
    4
}

fn default_min_paired_samples() -> usize {
    3
}

fn default_playback_duration() -> Duration {
    Duration::from_secs(10)
}

fn default_frame_interval() -> Duration {
    Duration::from_millis(16)
}

fn default_emit_interval() -> Duration {
    Duration::from_millis(50)
}

fn default_mix_epsilon() -> f64 {
    0.001
}

fn default_capture_grace() -> Duration {
    Duration::from_secs(5)
}

/// Primary configuration object for the asset twin tooling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when built-in defaults were used.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "R_EMS_CONFIG";

    /// Load configuration from disk, respecting the `R_EMS_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        let loaded = Self::load_with_source(candidates)?;
        if loaded.source.is_none() {
            return Err(anyhow!(
                "no configuration files found. inspected: {}",
                candidates
                    .iter()
                    .map(|p| p.as_ref().display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        Ok(loaded.config)
    }

    /// Like [`load`](Self::load) but falls back to defaults when no file exists.
    pub fn load_or_default<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path. The
    /// environment override must point at a readable file; candidates are
    /// tried in order and skipped when missing.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!("no configuration file found; using defaults");
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.analytics.validate()?;
        self.playback.validate()?;
        self.capture.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Also write a daily rolling JSON log under `directory`.
    #[serde(default = "default_file_logging")]
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            file: default_file_logging(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// TOML file merged over the built-in asset catalog.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
    #[serde(default = "default_max_insights")]
    pub max_insights: usize,
    #[serde(default = "default_min_paired_samples")]
    pub min_paired_samples: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            max_insights: default_max_insights(),
            min_paired_samples: default_min_paired_samples(),
        }
    }
}

impl AnalyticsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_insights == 0 {
            return Err(anyhow!("analytics.max_insights must be at least 1"));
        }
        if self.min_paired_samples < 2 {
            return Err(anyhow!(
                "analytics.min_paired_samples must be at least 2, got {}",
                self.min_paired_samples
            ));
        }
        Ok(())
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_playback_duration", rename = "duration_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub duration: Duration,
    #[serde(default = "default_frame_interval", rename = "frame_interval_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub frame_interval: Duration,
    #[serde(default = "default_emit_interval", rename = "emit_interval_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub emit_interval: Duration,
    #[serde(default = "default_mix_epsilon")]
    pub mix_epsilon: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            duration: default_playback_duration(),
            frame_interval: default_frame_interval(),
            emit_interval: default_emit_interval(),
            mix_epsilon: default_mix_epsilon(),
        }
    }
}

impl PlaybackConfig {
    pub fn validate(&self) -> Result<()> {
        if self.frame_interval.is_zero() {
            return Err(anyhow!("playback.frame_interval_ms must be positive"));
        }
        if self.emit_interval.is_zero() {
            return Err(anyhow!("playback.emit_interval_ms must be positive"));
        }
        if !(self.mix_epsilon.is_finite() && self.mix_epsilon > 0.0) {
            return Err(anyhow!(
                "playback.mix_epsilon must be a positive number, got {}",
                self.mix_epsilon
            ));
        }
        Ok(())
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Recorder executable. Receives the output path and the duration in
    /// milliseconds after `args`.
    #[serde(default)]
    pub command: Option<PathBuf>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default = "default_capture_grace", rename = "grace_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub grace: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: None,
            args: Vec::new(),
            output: None,
            grace: default_capture_grace(),
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.command.is_none() {
            return Err(anyhow!("capture.enabled requires capture.command"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_to_an_empty_document() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config.analytics.max_insights, 4);
        assert_eq!(config.analytics.min_paired_samples, 3);
        assert_eq!(config.playback.duration, Duration::from_secs(10));
        assert_eq!(config.playback.emit_interval, Duration::from_millis(50));
        assert_eq!(config.capture.grace, Duration::from_secs(5));
        assert!(!config.capture.enabled);
    }

    #[test]
    fn parses_millisecond_durations() {
        let config: AppConfig = r#"
            [playback]
            duration_ms = 2500
            frame_interval_ms = 20
            mix_epsilon = 0.01

            [analytics]
            max_insights = 2
        "#
        .parse()
        .unwrap();
        assert_eq!(config.playback.duration, Duration::from_millis(2500));
        assert_eq!(config.playback.frame_interval, Duration::from_millis(20));
        assert_eq!(config.playback.emit_interval, Duration::from_millis(50));
        assert_eq!(config.analytics.max_insights, 2);
    }

    #[test]
    fn rejects_invalid_sections() {
        assert!("[playback]\nemit_interval_ms = 0\n".parse::<AppConfig>().is_err());
        assert!("[playback]\nmix_epsilon = 0.0\n".parse::<AppConfig>().is_err());
        assert!("[analytics]\nmin_paired_samples = 1\n".parse::<AppConfig>().is_err());
        assert!("[capture]\nenabled = true\n".parse::<AppConfig>().is_err());
    }

    #[test]
    fn loads_first_existing_candidate() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analytics]\nmax_insights = 6").unwrap();
        let missing = PathBuf::from("does/not/exist.toml");
        let loaded =
            AppConfig::load_with_source(&[missing.as_path(), file.path()]).unwrap();
        assert_eq!(loaded.source.as_deref(), Some(file.path()));
        assert_eq!(loaded.config.analytics.max_insights, 6);
    }

    #[test]
    fn missing_candidates_fall_back_to_defaults() {
        let loaded = AppConfig::load_or_default(&["does/not/exist.toml"]).unwrap();
        assert_eq!(loaded.analytics.max_insights, 4);
        assert!(AppConfig::load(&["does/not/exist.toml"]).is_err());
    }
}
