//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Asset health analytics for simulated equipment timelines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use thiserror::Error;

use crate::model::AssetClass;

pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("simulation timeline is empty")]
    EmptyTimeline,
    #[error("timeline step {index} has non-finite time")]
    NonFiniteTime { index: usize },
    #[error("timeline step {index} moves backwards in time ({time} < {previous})")]
    UnorderedTimeline {
        index: usize,
        time: f64,
        previous: f64,
    },
    #[error("invalid threshold for {class}/{parameter}: {reason}")]
    InvalidThreshold {
        class: AssetClass,
        parameter: String,
        reason: String,
    },
    #[error("invalid blueprint for {class}/{subsystem}: {reason}")]
    InvalidBlueprint {
        class: AssetClass,
        subsystem: String,
        reason: String,
    },
    #[error("invalid condition model for {class}: {reason}")]
    InvalidConditionModel { class: AssetClass, reason: String },
    #[error("asset catalog has no profile for {0}")]
    MissingProfile(AssetClass),
    #[error("base lifespan for {class} must be positive, got {months}")]
    InvalidLifespan { class: AssetClass, months: f64 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    SerializationFailed(#[from] serde_json::Error),
    #[error("yaml serialization error: {0}")]
    YamlSerializationFailed(#[from] serde_yaml::Error),
    #[error("catalog parse error: {0}")]
    CatalogParseFailed(#[from] toml::de::Error),
}
