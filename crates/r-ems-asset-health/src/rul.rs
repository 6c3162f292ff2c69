//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Asset health analytics for simulated equipment timelines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Remaining-useful-life estimation.
//!
//! The optimistic figure scales the class's nominal lifespan by current health
//! and a remaining-life factor; the conservative figure applies a worst-case
//! discount on top. Both are whole months.

use serde::{Deserialize, Serialize};

use crate::{
    model::{FaultPrediction, Severity},
    resolve::{finite, Source},
};

pub const MIN_OPTIMISTIC_MONTHS: u32 = 6;
pub const MIN_CONSERVATIVE_MONTHS: u32 = 3;
const CONSERVATIVE_RATIO: f64 = 0.7;

const FAULT_PENALTY_CAP: f64 = 0.4;
const STRESS_PENALTY_CAP: f64 = 0.2;
const AGING_PENALTY_CAP: f64 = 0.3;
const WORST_CASE_CAP: f64 = 0.5;
const MIN_REMAINING_LIFE_FACTOR: f64 = 0.1;

pub const AGING_SPAN_YEARS: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulEstimate {
    pub optimistic_months: u32,
    pub conservative_months: u32,
    pub source: Source,
}

impl RulEstimate {
    pub fn no_data() -> Self {
        Self {
            optimistic_months: 0,
            conservative_months: 0,
            source: Source::NoData,
        }
    }
}

/// Inputs to the RUL heuristic besides the asset's base lifespan.
#[derive(Debug, Clone, Copy, Default)]
pub struct RulInputs<'a> {
    pub health: Option<f64>,
    pub faults: &'a [FaultPrediction],
    /// 0-100, higher is more stressed.
    pub stress: Option<f64>,
    /// 0-100, higher is younger.
    pub aging: Option<f64>,
}

pub fn health_factor(health: f64) -> f64 {
    if health >= 80.0 {
        1.0
    } else if health >= 60.0 {
        0.85
    } else if health >= 40.0 {
        0.65
    } else {
        0.4
    }
}

fn count(faults: &[FaultPrediction], severity: Severity) -> usize {
    faults.iter().filter(|fault| fault.severity == severity).count()
}

fn to_months(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Aging factor (100 = new) from the installation year, linear over
/// [`AGING_SPAN_YEARS`].
pub fn aging_from_installation(installation_year: i32, current_year: i32) -> f64 {
    let age = (f64::from(current_year) - f64::from(installation_year)) / AGING_SPAN_YEARS;
    100.0 * (1.0 - age.clamp(0.0, 1.0))
}

/// Heuristic estimate for an asset with `base_life_months` of nominal life.
pub fn estimate(base_life_months: f64, inputs: RulInputs<'_>) -> RulEstimate {
    let Some(health) = finite(inputs.health) else {
        return RulEstimate::no_data();
    };
    let health = health.clamp(0.0, 100.0);
    let stress = finite(inputs.stress).unwrap_or(0.0).clamp(0.0, 100.0);
    let critical = count(inputs.faults, Severity::Critical) as f64;
    let high = count(inputs.faults, Severity::High) as f64;

    let fault_penalty = (0.15 * critical + 0.08 * high).min(FAULT_PENALTY_CAP);
    let stress_penalty = (0.2 * stress / 100.0).min(STRESS_PENALTY_CAP);
    let aging_penalty = finite(inputs.aging)
        .map(|aging| (0.3 * (100.0 - aging.clamp(0.0, 100.0)) / 100.0).min(AGING_PENALTY_CAP))
        .unwrap_or(0.0);
    let penalties = fault_penalty + stress_penalty + aging_penalty;

    let remaining_life_factor =
        (health_factor(health) * (1.0 - penalties)).max(MIN_REMAINING_LIFE_FACTOR);
    let optimistic = to_months(base_life_months * (health / 100.0) * remaining_life_factor)
        .max(MIN_OPTIMISTIC_MONTHS);

    let worst_case = (0.1 * critical + 0.25 * stress / 100.0).min(WORST_CASE_CAP);
    let conservative = to_months(optimistic as f64 * CONSERVATIVE_RATIO * (1.0 - worst_case))
        .max(MIN_CONSERVATIVE_MONTHS)
        .min(optimistic);

    RulEstimate {
        optimistic_months: optimistic,
        conservative_months: conservative,
        source: Source::Derived,
    }
}

/// Use externally supplied RUL figures, deriving a missing side by scaling
/// and keeping `conservative <= optimistic`.
pub fn from_external(optimistic: Option<f64>, conservative: Option<f64>) -> Option<RulEstimate> {
    let (optimistic, conservative) = match (finite(optimistic), finite(conservative)) {
        (Some(o), Some(c)) => (to_months(o), to_months(c)),
        (Some(o), None) => (to_months(o), to_months(o * CONSERVATIVE_RATIO)),
        (None, Some(c)) => (to_months(c / CONSERVATIVE_RATIO), to_months(c)),
        (None, None) => return None,
    };
    Some(RulEstimate {
        optimistic_months: optimistic,
        conservative_months: conservative.min(optimistic),
        source: Source::External,
    })
}

/// External figures when present, otherwise the heuristic.
pub fn resolve_rul(
    base_life_months: f64,
    inputs: RulInputs<'_>,
    external_optimistic: Option<f64>,
    external_conservative: Option<f64>,
) -> RulEstimate {
    from_external(external_optimistic, external_conservative)
        .unwrap_or_else(|| estimate(base_life_months, inputs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fault(severity: Severity) -> FaultPrediction {
        FaultPrediction {
            fault_type: "Contact Wear".into(),
            probability: 0.7,
            severity,
            time_to_failure_hours: Some(720.0),
            affected_subpart: None,
        }
    }

    #[test]
    fn healthy_transformer() {
        let estimate = estimate(
            480.0,
            RulInputs {
                health: Some(90.0),
                ..Default::default()
            },
        );
        assert_eq!(estimate.optimistic_months, 432);
        assert_eq!(estimate.conservative_months, 302);
        assert_eq!(estimate.source, Source::Derived);
    }

    #[test]
    fn penalties_are_capped() {
        let faults: Vec<_> = (0..10).map(|_| fault(Severity::Critical)).collect();
        let estimate = estimate(
            480.0,
            RulInputs {
                health: Some(50.0),
                faults: &faults,
                stress: Some(100.0),
                aging: Some(0.0),
            },
        );
        // penalties 0.4 + 0.2 + 0.3 leave a factor of 0.65 * 0.1 -> floor 0.1
        assert_eq!(estimate.optimistic_months, 24);
        // worst case capped at 0.5
        assert_eq!(estimate.conservative_months, 8);
    }

    #[test]
    fn floors_and_ordering_hold_across_inputs() {
        for health in (0..=100).step_by(5) {
            for stress in [0.0, 35.0, 80.0, 100.0] {
                for aging in [0.0, 50.0, 100.0] {
                    for criticals in 0..4 {
                        let faults: Vec<_> = (0..criticals).map(|_| fault(Severity::Critical)).collect();
                        let estimate = estimate(
                            300.0,
                            RulInputs {
                                health: Some(health as f64),
                                faults: &faults,
                                stress: Some(stress),
                                aging: Some(aging),
                            },
                        );
                        assert!(estimate.optimistic_months >= MIN_OPTIMISTIC_MONTHS);
                        assert!(estimate.conservative_months >= MIN_CONSERVATIVE_MONTHS);
                        assert!(estimate.conservative_months <= estimate.optimistic_months);
                    }
                }
            }
        }
    }

    #[test]
    fn aging_is_linear_over_forty_years() {
        assert_eq!(aging_from_installation(2026, 2026), 100.0);
        assert_eq!(aging_from_installation(2006, 2026), 50.0);
        assert_eq!(aging_from_installation(1950, 2026), 0.0);
        assert_eq!(aging_from_installation(2030, 2026), 100.0);
        assert_eq!(aging_from_installation(i32::MIN, 2026), 0.0);
        assert_eq!(aging_from_installation(i32::MAX, i32::MIN), 100.0);
    }

    #[test]
    fn missing_health_is_no_data() {
        assert_eq!(estimate(480.0, RulInputs::default()), RulEstimate::no_data());
    }

    #[test]
    fn external_values_keep_the_invariant() {
        let both = from_external(Some(100.0), Some(140.0)).unwrap();
        assert_eq!(both.optimistic_months, 100);
        assert_eq!(both.conservative_months, 100);
        let only_optimistic = from_external(Some(100.0), None).unwrap();
        assert_eq!(only_optimistic.conservative_months, 70);
        let only_conservative = from_external(None, Some(70.0)).unwrap();
        assert_eq!(only_conservative.optimistic_months, 100);
        assert!(from_external(None, None).is_none());
        assert_eq!(
            resolve_rul(480.0, RulInputs::default(), Some(55.0), None).source,
            Source::External
        );
    }
}
