//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Asset health analytics for simulated equipment timelines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Per-subsystem health scoring.
//!
//! Every blueprint term maps one parameter onto a 0-1 stress figure. A
//! subsystem scores `100 * (1 - weighted mean stress)` over the terms whose
//! parameter is present in the state, so a partially populated state still
//! scores the subsystems it can.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    catalog::AssetCatalog,
    errors::{AnalyticsError, Result},
    model::{numeric, AssetClass, ParameterState},
    resolve::{resolve, Resolved},
};

pub const OVERALL_KEY: &str = "overall";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StressCurve {
    /// Stress grows as the value climbs from `lo` to `hi`.
    Rising { lo: f64, hi: f64 },
    /// Stress grows as the value falls from `hi` to `lo`.
    Falling { lo: f64, hi: f64 },
    /// Stress grows with distance from `nominal`, saturating at `span`.
    Deviation { nominal: f64, span: f64 },
}

impl StressCurve {
    pub fn stress(&self, value: f64) -> f64 {
        match *self {
            StressCurve::Rising { lo, hi } => ((value - lo) / (hi - lo)).clamp(0.0, 1.0),
            StressCurve::Falling { lo, hi } => 1.0 - ((value - lo) / (hi - lo)).clamp(0.0, 1.0),
            StressCurve::Deviation { nominal, span } => ((value - nominal).abs() / span).clamp(0.0, 1.0),
        }
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        match *self {
            StressCurve::Rising { lo, hi } | StressCurve::Falling { lo, hi } => {
                lo.is_finite() && hi.is_finite() && hi > lo
            }
            StressCurve::Deviation { nominal, span } => nominal.is_finite() && span.is_finite() && span > 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreTerm {
    pub parameter: String,
    pub weight: f64,
    pub curve: StressCurve,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsystemBlueprint {
    pub key: String,
    #[serde(default)]
    pub label: String,
    pub terms: Vec<ScoreTerm>,
}

impl SubsystemBlueprint {
    pub fn validate(&self, class: AssetClass) -> Result<()> {
        let invalid = |reason: String| AnalyticsError::InvalidBlueprint {
            class,
            subsystem: self.key.clone(),
            reason,
        };
        if self.key == OVERALL_KEY {
            return Err(invalid(format!("'{}' is reserved", OVERALL_KEY)));
        }
        if self.terms.is_empty() {
            return Err(invalid("blueprint has no terms".into()));
        }
        for term in &self.terms {
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
        Ok(())
    }

    /// Score in [0, 100], or `None` when none of the terms have data.
    pub fn score(&self, state: &ParameterState) -> Option<f64> {
        let (weighted, total) = self
            .terms
            .iter()
            .filter_map(|term| {
                numeric(state, &term.parameter).map(|v| (term.weight * term.curve.stress(v), term.weight))
            })
            .fold((0.0, 0.0), |(acc_s, acc_w), (s, w)| (acc_s + s, acc_w + w));
        if total <= 0.0 {
            return None;
        }
        Some((100.0 * (1.0 - weighted / total)).clamp(0.0, 100.0))
    }
}

/// Subsystem key to 0-100 score, with the derived `overall` entry last.
///
/// A missing key means "no data", never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HealthScoreSet {
    scores: IndexMap<String, f64>,
}

impl HealthScoreSet {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.scores.get(key).copied()
    }

    pub fn overall(&self) -> Option<f64> {
        self.get(OVERALL_KEY)
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Subsystem scores, excluding `overall`.
    pub fn subsystems(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores
            .iter()
            .filter(|(key, _)| key.as_str() != OVERALL_KEY)
            .map(|(key, value)| (key.as_str(), *value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores.iter().map(|(key, value)| (key.as_str(), *value))
    }
}

/// Convert an externally supplied health figure to percent. Predictors report
/// it either as a 0-1 fraction or as a 0-100 score.
pub fn health_percent(raw: f64) -> f64 {
    if raw <= 1.0 {
        raw * 100.0
    } else {
        raw
    }
}

/// An external true health usable as the authoritative figure, in percent.
/// Zero and non-finite values are treated as absent.
pub fn external_health(raw: Option<f64>) -> Option<f64> {
    raw.filter(|h| h.is_finite() && *h > 0.0)
        .map(|h| health_percent(h).clamp(0.0, 100.0))
}

#[derive(Debug, Clone, Copy)]
pub struct HealthScorer<'a> {
    catalog: &'a AssetCatalog,
}

impl<'a> HealthScorer<'a> {
    pub fn new(catalog: &'a AssetCatalog) -> Self {
        Self { catalog }
    }

    pub fn score(&self, class: AssetClass, state: &ParameterState) -> HealthScoreSet {
        self.score_with(class, state, None)
    }

    /// Score every subsystem and derive `overall`, preferring a positive
    /// externally supplied true health over the subsystem average.
    pub fn score_with(
        &self,
        class: AssetClass,
        state: &ParameterState,
        external: Option<f64>,
    ) -> HealthScoreSet {
        let mut scores = IndexMap::new();
        if let Some(profile) = self.catalog.profile(class) {
            for blueprint in &profile.subsystems {
                if let Some(score) = blueprint.score(state) {
                    scores.insert(blueprint.key.clone(), score);
                }
            }
        }
        if scores.is_empty() {
            debug!(class = %class, "no scorable parameters in state");
            return HealthScoreSet::default();
        }

        let average = scores.values().sum::<f64>() / scores.len() as f64;
        let overall: Resolved<f64> = resolve(external_health(external), Some(average))
        .unwrap_or_else(|| Resolved::derived(average));
        scores.insert(OVERALL_KEY.to_owned(), overall.value.clamp(0.0, 100.0));
        debug!(class = %class, subsystems = scores.len() - 1, overall = overall.value, source = %overall.source, "health scored");
        HealthScoreSet { scores }
    }
}
