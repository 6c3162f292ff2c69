//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Asset health analytics for simulated equipment timelines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Locally derived condition channels.
//!
//! Each asset class weighs a handful of parameters into an environmental
//! stress figure and a fault probability. Terms reuse the health blueprint
//! [`StressCurve`]s to normalise a reading onto 0-1. Missing parameters are
//! assumed to track the ones present, so a partial state is scaled up to the
//! full weight of the model rather than read as zero.

use serde::{Deserialize, Serialize};

use crate::{
    errors::{AnalyticsError, Result},
    model::{numeric, AssetClass, ParameterState},
    scoring::ScoreTerm,
};

pub const AGING_FACTOR_KEY: &str = "aging";
pub const IMPACT_FACTOR_LIMIT: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionModel {
    #[serde(default)]
    pub stress: Vec<ScoreTerm>,
    #[serde(default)]
    pub fault: Vec<ScoreTerm>,
    /// Share of the fault probability carried by asset age.
    #[serde(default)]
    pub aging_weight: f64,
}

/// A parameter's share of the derived fault probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactFactor {
    pub parameter: String,
    pub contribution: f64,
}

/// Age as a 0-1 fraction of the aging span from a 0-100 aging factor.
fn age_fraction(aging_factor: Option<f64>) -> f64 {
    aging_factor
        .filter(|a| a.is_finite())
        .map_or(0.0, |a| 1.0 - a.clamp(0.0, 100.0) / 100.0)
}

fn blend(terms: &[ScoreTerm], state: &ParameterState) -> Option<f64> {
    let total: f64 = terms.iter().map(|term| term.weight).sum();
    let (weighted, present) = terms
        .iter()
        .filter_map(|term| {
            numeric(state, &term.parameter).map(|v| (term.weight * term.curve.stress(v), term.weight))
        })
        .fold((0.0, 0.0), |(acc_s, acc_w), (s, w)| (acc_s + s, acc_w + w));
    if present <= 0.0 {
        return None;
    }
    Some((weighted / present * total).clamp(0.0, 1.0))
}

impl ConditionModel {
    pub fn validate(&self, class: AssetClass) -> Result<()> {
        let invalid = |reason: String| AnalyticsError::InvalidConditionModel { class, reason };
        for term in self.stress.iter().chain(&self.fault) {
            if !(term.weight.is_finite() && term.weight > 0.0) {
                return Err(invalid(format!(
                    "term '{}' needs a positive weight",
                    term.parameter
                )));
            }
            if !term.curve.is_well_formed() {
                return Err(invalid(format!(
                    "term '{}' has a degenerate stress curve",
                    term.parameter
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.aging_weight) {
            return Err(invalid(format!(
                "aging weight {} is outside [0, 1]",
                self.aging_weight
            )));
        }
        Ok(())
    }

    /// Environmental stress on the 0-100 scale, or `None` without readings.
    pub fn stress_score(&self, state: &ParameterState) -> Option<f64> {
        blend(&self.stress, state).map(|stress| stress * 100.0)
    }

    /// Fault probability in [0, 1], or `None` without readings. Age only
    /// adds to a probability derived from readings.
    pub fn fault_probability(&self, state: &ParameterState, aging_factor: Option<f64>) -> Option<f64> {
        blend(&self.fault, state)
            .map(|p| (p + self.aging_weight * age_fraction(aging_factor)).clamp(0.0, 1.0))
    }

    /// The largest contributors to the fault probability, highest first.
    pub fn impact_factors(&self, state: &ParameterState, aging_factor: Option<f64>) -> Vec<ImpactFactor> {
        let mut factors: Vec<ImpactFactor> = self
            .fault
            .iter()
            .filter_map(|term| {
                numeric(state, &term.parameter).map(|v| ImpactFactor {
                    parameter: term.parameter.clone(),
                    contribution: term.weight * term.curve.stress(v),
                })
            })
            .collect();
        if factors.is_empty() {
            return factors;
        }
        let aging = self.aging_weight * age_fraction(aging_factor);
        if aging > 0.0 {
            factors.push(ImpactFactor {
                parameter: AGING_FACTOR_KEY.to_owned(),
                contribution: aging,
            });
        }
        factors.sort_by(|a, b| b.contribution.total_cmp(&a.contribution));
        factors.truncate(IMPACT_FACTOR_LIMIT);
        factors
    }
}
