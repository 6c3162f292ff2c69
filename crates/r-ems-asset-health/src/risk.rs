//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Asset health analytics for simulated equipment timelines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::{
    model::{FaultPrediction, HorizonProbabilities},
    resolve::{finite, Source},
};

pub const MAX_RISK_SCORE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskProfile {
    pub risk_score: f64,
    pub short_term: f64,
    pub medium_term: f64,
    pub long_term: f64,
    pub source: Source,
}

impl RiskProfile {
    /// Zero profile reported when there is no health signal to work from.
    pub fn no_data() -> Self {
        Self {
            risk_score: 0.0,
            short_term: 0.0,
            medium_term: 0.0,
            long_term: 0.0,
            source: Source::NoData,
        }
    }

    pub fn has_data(&self) -> bool {
        self.source != Source::NoData
    }
}

/// Composite 0-10 risk score from health and the fault list.
pub fn risk_score(health: f64, faults: &[FaultPrediction]) -> f64 {
    let fault_load: f64 = faults.iter().map(|fault| fault.severity.weight()).sum();
    let score = MAX_RISK_SCORE - health / 12.0 + fault_load / 2.0;
    if score.is_finite() {
        score.clamp(0.0, MAX_RISK_SCORE)
    } else {
        MAX_RISK_SCORE
    }
}

/// Horizon buckets in percent. Longer horizons carry more risk.
pub fn horizon_buckets(risk_score: f64) -> HorizonProbabilities {
    let bucket = |value: f64| value.clamp(5.0, 100.0);
    HorizonProbabilities {
        short_term: bucket(risk_score * 6.0),
        medium_term: bucket(risk_score * 8.0 + 5.0),
        long_term: bucket(risk_score * 10.0 + 10.0),
    }
}

pub fn risk(health: Option<f64>, faults: &[FaultPrediction]) -> RiskProfile {
    risk_with(health, faults, None)
}

/// Risk profile with externally supplied horizon probabilities taking the
/// place of the derived buckets. Without a health figure the score is never
/// synthesised.
pub fn risk_with(
    health: Option<f64>,
    faults: &[FaultPrediction],
    external_horizons: Option<HorizonProbabilities>,
) -> RiskProfile {
    let external_horizons = external_horizons.filter(|h| {
        h.short_term.is_finite() && h.medium_term.is_finite() && h.long_term.is_finite()
    });
    let percent = |value: f64| value.clamp(0.0, 100.0);

    let Some(health) = finite(health) else {
        return match external_horizons {
            Some(horizons) => RiskProfile {
                risk_score: 0.0,
                short_term: percent(horizons.short_term),
                medium_term: percent(horizons.medium_term),
                long_term: percent(horizons.long_term),
                source: Source::External,
            },
            None => RiskProfile::no_data(),
        };
    };

    let score = risk_score(health, faults);
    let (horizons, source) = match external_horizons {
        Some(horizons) => (horizons, Source::External),
        None => (horizon_buckets(score), Source::Derived),
    };
    RiskProfile {
        risk_score: score,
        short_term: percent(horizons.short_term),
        medium_term: percent(horizons.medium_term),
        long_term: percent(horizons.long_term),
        source,
    }
}
