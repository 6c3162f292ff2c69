//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Asset health analytics for simulated equipment timelines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Analytics over simulated asset timelines: threshold severities, subsystem
//! health, condition channels, fault predictions, parameter correlations,
//! risk horizons and remaining useful life.
//!
//! Everything here is synchronous and works on an immutable [`AssetCatalog`],
//! so a catalog can be shared freely between threads.

pub mod catalog;
pub mod condition;
pub mod correlation;
pub mod errors;
pub mod faults;
pub mod io;
pub mod model;
pub mod resolve;
pub mod risk;
pub mod rul;
pub mod scoring;
pub mod thresholds;

use chrono::{DateTime, Datelike, Utc};
use indexmap::IndexMap;
use r_ems_common::AnalyticsConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    condition::{ConditionModel, ImpactFactor},
    correlation::{CorrelationAnalyzer, CorrelationInsight, CorrelationLimits},
    model::{AssetClass, FaultPrediction, HealthMetrics, ParameterState, SimulationRecord, Severity},
    resolve::{finite, resolve},
    risk::RiskProfile,
    rul::{RulEstimate, RulInputs},
    scoring::{external_health, HealthScoreSet, HealthScorer},
    thresholds::ThresholdEvaluator,
};

pub use catalog::AssetCatalog;
pub use errors::{AnalyticsError, Result};

impl From<&AnalyticsConfig> for CorrelationLimits {
    fn from(config: &AnalyticsConfig) -> Self {
        Self {
            max_insights: config.max_insights,
            min_paired_samples: config.min_paired_samples,
        }
    }
}

/// Everything the analytics derive for one simulation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetHealthSummary {
    pub timestamp: DateTime<Utc>,
    pub record_id: Option<String>,
    pub asset_class: AssetClass,
    pub health: HealthScoreSet,
    pub severities: IndexMap<String, Severity>,
    pub faults: Vec<FaultPrediction>,
    pub impact_factors: Vec<ImpactFactor>,
    pub correlations: Vec<CorrelationInsight>,
    pub risk: RiskProfile,
    pub rul: RulEstimate,
    pub metrics: HealthMetrics,
}

/// Final-state condition channels: external figure, then the last step's
/// auxiliary scores, then values derived from the terminal state through the
/// class's condition model, then the ideal baseline.
pub fn resolve_metrics(
    catalog: &AssetCatalog,
    record: &SimulationRecord,
    health: &HealthScoreSet,
    current_year: i32,
) -> HealthMetrics {
    let external = &record.external;
    let aux = record.terminal_aux();
    let empty = ParameterState::new();
    let terminal = record.terminal_state().unwrap_or(&empty);
    let model = condition_model(catalog, record.asset_class);
    let pick = |external: Option<f64>, local: Option<f64>, baseline: f64| {
        resolve(finite(external), finite(local))
            .map(|resolved| resolved.value)
            .unwrap_or(baseline)
    };
    let base = HealthMetrics::BASELINE;
    let aging = pick(
        external.aging_factor,
        aux.aging_factor.or_else(|| {
            record
                .installation_year()
                .map(|year| rul::aging_from_installation(year, current_year))
        }),
        base.aging_factor,
    );
    HealthMetrics {
        true_health: pick(
            external_health(external.true_health),
            health.overall().or(aux.true_health),
            base.true_health,
        ),
        stress_score: pick(
            external.stress_score,
            finite(aux.stress_score).or_else(|| model.stress_score(terminal)),
            base.stress_score,
        ),
        fault_probability: pick(
            external.fault_probability,
            finite(aux.fault_probability).or_else(|| model.fault_probability(terminal, Some(aging))),
            base.fault_probability,
        ),
        aging_factor: aging,
    }
}

fn condition_model(catalog: &AssetCatalog, class: AssetClass) -> &ConditionModel {
    static EMPTY: ConditionModel = ConditionModel {
        stress: Vec::new(),
        fault: Vec::new(),
        aging_weight: 0.0,
    };
    catalog
        .profile(class)
        .map_or(&EMPTY, |profile| &profile.condition)
}

/// External predictions when supplied, otherwise the heuristic prediction for
/// the resolved fault probability.
fn predicted_faults(record: &SimulationRecord, fault_probability: f64) -> Vec<FaultPrediction> {
    if let Some(faults) = &record.external.fault_predictions {
        return faults.clone();
    }
    faults::heuristic_prediction(record.asset_class, fault_probability)
        .into_iter()
        .collect()
}

/// Run the full analytics pipeline over `record`.
pub fn analyze_record(
    catalog: &AssetCatalog,
    config: &AnalyticsConfig,
    record: &SimulationRecord,
) -> Result<AssetHealthSummary> {
    analyze_record_at(catalog, config, record, Utc::now())
}

/// [`analyze_record`] with an explicit timestamp, used for the summary and
/// for aging derived from the installation year.
pub fn analyze_record_at(
    catalog: &AssetCatalog,
    config: &AnalyticsConfig,
    record: &SimulationRecord,
    timestamp: DateTime<Utc>,
) -> Result<AssetHealthSummary> {
    record.validate()?;
    let class = record.asset_class;
    let terminal = record.terminal_state().cloned().unwrap_or_default();

    info!(class = %class, steps = record.timeline.len(), "evaluating thresholds...");
    let severities = ThresholdEvaluator::new(catalog).evaluate_state(class, &terminal);

    info!(class = %class, "scoring subsystem health...");
    let health =
        HealthScorer::new(catalog).score_with(class, &terminal, record.external.true_health);
    if health.is_empty() {
        warn!(class = %class, "no scorable parameters; health reported as no-data");
    }

    let metrics = resolve_metrics(catalog, record, &health, timestamp.year());
    let faults = predicted_faults(record, metrics.fault_probability);
    let impact_factors =
        condition_model(catalog, class).impact_factors(&terminal, Some(metrics.aging_factor));
    if !faults.is_empty() {
        info!(class = %class, faults = faults.len(), probability = metrics.fault_probability, "fault predicted");
    }

    info!(class = %class, "correlating parameters...");
    let correlations = CorrelationAnalyzer::new(catalog)
        .with_limits(CorrelationLimits::from(config))
        .correlate_with(class, &record.timeline, &record.external.correlation_strengths);

    let overall = resolve(external_health(record.external.true_health), health.overall())
        .map(|resolved| resolved.value);

    info!(class = %class, "projecting risk and remaining life...");
    let risk = risk::risk_with(overall, &faults, record.external.horizon_probabilities);
    let base_life = catalog
        .base_life_months(class)
        .ok_or(AnalyticsError::MissingProfile(class))?;
    let rul = rul::resolve_rul(
        base_life,
        RulInputs {
            health: overall,
            faults: &faults,
            stress: Some(metrics.stress_score),
            aging: Some(metrics.aging_factor),
        },
        record.external.rul_optimistic_months,
        record.external.rul_conservative_months,
    );

    Ok(AssetHealthSummary {
        timestamp,
        record_id: record.id.clone(),
        asset_class: class,
        health,
        severities,
        faults,
        impact_factors,
        correlations,
        risk,
        rul,
        metrics,
    })
}
