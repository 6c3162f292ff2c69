//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Asset health analytics for simulated equipment timelines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::ops::RangeInclusive;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::errors::{AnalyticsError, Result};

/// Equipment categories served by the simulation executor.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum AssetClass {
    Transformer,
    BayLines,
    CircuitBreaker,
    Isolator,
    Busbar,
}

/// A single parameter reading. Simulation payloads mix numbers with
/// numeric-looking strings and the occasional label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl ParamValue {
    /// Finite numeric view of the value, parsing numeric-looking text.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(value) => Some(*value).filter(|v| v.is_finite()),
            ParamValue::Text(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            ParamValue::Flag(_) => None,
        }
    }

    pub fn number_or(&self, fallback: f64) -> f64 {
        self.as_number().unwrap_or(fallback)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

pub type ParameterState = IndexMap<String, ParamValue>;

/// Numeric value for `key`, or `None` when absent or not a finite number.
pub fn numeric(state: &ParameterState, key: &str) -> Option<f64> {
    state.get(key).and_then(ParamValue::as_number)
}

/// Severity band assigned by the threshold evaluator. Ordered from least to
/// most severe.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    #[default]
    Normal,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Contribution of a fault at this severity to the composite risk score.
    pub fn weight(&self) -> f64 {
        match self {
            Severity::Critical => 3.0,
            Severity::High => 2.0,
            Severity::Medium => 1.2,
            Severity::Low => 0.5,
            Severity::Normal => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultPrediction {
    #[serde(rename = "type")]
    pub fault_type: String,
    pub probability: f64,
    pub severity: Severity,
    #[serde(default, rename = "timeToFailure")]
    pub time_to_failure_hours: Option<f64>,
    #[serde(default)]
    pub affected_subpart: Option<String>,
}

/// The four auxiliary condition channels, fully populated.
///
/// Each channel keeps its natural polarity: `true_health` and `aging_factor`
/// are 0-100 with higher meaning better, `stress_score` is 0-100 with higher
/// meaning more stressed and `fault_probability` is a 0-1 probability. Display
/// inversions belong to [`HealthMetrics::condition_scores`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    pub true_health: f64,
    pub stress_score: f64,
    pub fault_probability: f64,
    pub aging_factor: f64,
}

impl HealthMetrics {
    /// Ideal state every playback starts from.
    pub const BASELINE: HealthMetrics = HealthMetrics {
        true_health: 100.0,
        stress_score: 0.0,
        fault_probability: 0.0,
        aging_factor: 100.0,
    };

    /// All four channels mapped onto a 0-100 "higher is better" scale.
    pub fn condition_scores(&self) -> ConditionScores {
        ConditionScores {
            health: self.true_health.clamp(0.0, 100.0),
            stress_margin: (100.0 - self.stress_score).clamp(0.0, 100.0),
            fault_margin: ((1.0 - self.fault_probability) * 100.0).clamp(0.0, 100.0),
            aging: self.aging_factor.clamp(0.0, 100.0),
        }
    }
}

impl Default for HealthMetrics {
    fn default() -> Self {
        Self::BASELINE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionScores {
    pub health: f64,
    pub stress_margin: f64,
    pub fault_margin: f64,
    pub aging: f64,
}

/// Per-step auxiliary scores as delivered; any channel may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuxScores {
    #[serde(default)]
    pub true_health: Option<f64>,
    #[serde(default)]
    pub stress_score: Option<f64>,
    #[serde(default)]
    pub fault_probability: Option<f64>,
    #[serde(default)]
    pub aging_factor: Option<f64>,
}

impl AuxScores {
    /// Fill missing or non-finite channels from `base`.
    pub fn or_baseline(&self, base: HealthMetrics) -> HealthMetrics {
        let pick = |value: Option<f64>, fallback: f64| value.filter(|v| v.is_finite()).unwrap_or(fallback);
        HealthMetrics {
            true_health: pick(self.true_health, base.true_health),
            stress_score: pick(self.stress_score, base.stress_score),
            fault_probability: pick(self.fault_probability, base.fault_probability),
            aging_factor: pick(self.aging_factor, base.aging_factor),
        }
    }
}

impl From<HealthMetrics> for AuxScores {
    fn from(metrics: HealthMetrics) -> Self {
        Self {
            true_health: Some(metrics.true_health),
            stress_score: Some(metrics.stress_score),
            fault_probability: Some(metrics.fault_probability),
            aging_factor: Some(metrics.aging_factor),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineStep {
    pub time: f64,
    #[serde(default)]
    pub state: ParameterState,
    #[serde(default)]
    pub health_score: Option<f64>,
    #[serde(default)]
    pub aux_scores: Option<AuxScores>,
}

impl TimelineStep {
    pub fn new(time: f64, state: ParameterState) -> Self {
        Self {
            time,
            state,
            health_score: None,
            aux_scores: None,
        }
    }

    pub fn metrics(&self) -> HealthMetrics {
        self.aux_scores
            .unwrap_or_default()
            .or_baseline(HealthMetrics::BASELINE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorizonProbabilities {
    pub short_term: f64,
    pub medium_term: f64,
    pub long_term: f64,
}

/// Precomputed association strength for a parameter pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationStrength {
    pub a: String,
    pub b: String,
    pub strength: f64,
}

impl CorrelationStrength {
    pub fn matches(&self, a: &str, b: &str) -> bool {
        (self.a == a && self.b == b) || (self.a == b && self.b == a)
    }
}

/// Fields an upstream model may attach to a simulation record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalPredictions {
    #[serde(default, alias = "overallHealth")]
    pub true_health: Option<f64>,
    #[serde(default)]
    pub stress_score: Option<f64>,
    #[serde(default)]
    pub fault_probability: Option<f64>,
    #[serde(default)]
    pub aging_factor: Option<f64>,
    #[serde(default)]
    pub horizon_probabilities: Option<HorizonProbabilities>,
    #[serde(default)]
    pub correlation_strengths: Vec<CorrelationStrength>,
    #[serde(default, alias = "rul_optimistic_months")]
    pub rul_optimistic_months: Option<f64>,
    #[serde(default, alias = "rul_conservative_months")]
    pub rul_conservative_months: Option<f64>,
    #[serde(default)]
    pub fault_predictions: Option<Vec<FaultPrediction>>,
}

/// Plausible installation years.
pub const INSTALLATION_YEARS: RangeInclusive<i32> = 1900..=2200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "componentType")]
    pub asset_class: AssetClass,
    #[serde(default)]
    pub timeline: Vec<TimelineStep>,
    #[serde(default)]
    pub final_state: ParameterState,
    #[serde(default)]
    pub input_values: ParameterState,
    #[serde(default)]
    pub installation_year: Option<i32>,
    #[serde(flatten)]
    pub external: ExternalPredictions,
}

impl SimulationRecord {
    pub fn new(asset_class: AssetClass, timeline: Vec<TimelineStep>) -> Self {
        Self {
            id: None,
            asset_class,
            timeline,
            final_state: ParameterState::new(),
            input_values: ParameterState::new(),
            installation_year: None,
            external: ExternalPredictions::default(),
        }
    }

    /// Check that step times are finite and never move backwards.
    pub fn validate(&self) -> Result<()> {
        validate_timeline(&self.timeline)
    }

    /// The terminal parameter state: `final_state` when populated, otherwise
    /// the last timeline step.
    pub fn terminal_state(&self) -> Option<&ParameterState> {
        if !self.final_state.is_empty() {
            return Some(&self.final_state);
        }
        self.timeline.last().map(|step| &step.state)
    }

    pub fn terminal_aux(&self) -> AuxScores {
        self.timeline
            .last()
            .and_then(|step| step.aux_scores)
            .unwrap_or_default()
    }

    /// Installation year from the record or its input values. Years outside
    /// [`INSTALLATION_YEARS`] are ignored.
    pub fn installation_year(&self) -> Option<i32> {
        self.installation_year
            .or_else(|| {
                numeric(&self.input_values, "installationYear")
                    .filter(|year| year.is_finite())
                    .map(|year| year.round() as i32)
            })
            .filter(|year| INSTALLATION_YEARS.contains(year))
    }
}

pub fn validate_timeline(timeline: &[TimelineStep]) -> Result<()> {
    if timeline.is_empty() {
        return Err(AnalyticsError::EmptyTimeline);
    }
    let mut previous: Option<f64> = None;
    for (index, step) in timeline.iter().enumerate() {
        if !step.time.is_finite() {
            return Err(AnalyticsError::NonFiniteTime { index });
        }
        if let Some(prev) = previous {
            if step.time < prev {
                return Err(AnalyticsError::UnorderedTimeline {
                    index,
                    time: step.time,
                    previous: prev,
                });
            }
        }
        previous = Some(step.time);
    }
    Ok(())
}
