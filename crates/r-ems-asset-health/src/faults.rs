//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Asset health analytics for simulated equipment timelines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use crate::model::{AssetClass, FaultPrediction, Severity};

/// Probability below which no fault is reported.
pub const FAULT_REPORT_THRESHOLD: f64 = 0.55;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultMode {
    pub name: &'static str,
    pub subpart: &'static str,
}

const fn mode(name: &'static str, subpart: &'static str) -> FaultMode {
    FaultMode { name, subpart }
}

const TRANSFORMER: &[FaultMode] = &[
    mode("Winding Hotspot", "HV winding"),
    mode("Oil Degradation", "Main tank"),
    mode("Tap Changer Wear", "OLTC compartment"),
];

const BAY_LINES: &[FaultMode] = &[
    mode("Power Swing / Stability Risk", "Line section A"),
    mode("Voltage Sag", "PT circuit"),
    mode("Current Unbalance", "CT core"),
];

const CIRCUIT_BREAKER: &[FaultMode] = &[
    mode("Slow Operating Mechanism", "Spring drive"),
    mode("SF6 Leak", "Tank"),
    mode("Contact Wear", "Arcing contact"),
];

const ISOLATOR: &[FaultMode] = &[
    mode("Drive Torque Drop", "Drive shaft"),
    mode("Contact Resistance Rise", "Jaw contact"),
    mode("Motor Stall", "Motor unit"),
];

const BUSBAR: &[FaultMode] = &[
    mode("Thermal Hotspot", "Section-2"),
    mode("Shield Connection Loose", "Spacer clamp"),
    mode("Overload Risk", "Phase B"),
];

/// Known failure modes per asset class, most likely first.
pub fn fault_modes(class: AssetClass) -> &'static [FaultMode] {
    match class {
        AssetClass::Transformer => TRANSFORMER,
        AssetClass::BayLines => BAY_LINES,
        AssetClass::CircuitBreaker => CIRCUIT_BREAKER,
        AssetClass::Isolator => ISOLATOR,
        AssetClass::Busbar => BUSBAR,
    }
}

pub fn severity_for_probability(probability: f64) -> Severity {
    if probability >= 0.9 {
        Severity::Critical
    } else if probability >= 0.75 {
        Severity::High
    } else if probability >= 0.65 {
        Severity::Medium
    } else if probability >= FAULT_REPORT_THRESHOLD {
        Severity::Low
    } else {
        Severity::Normal
    }
}

/// Single fault prediction from an aggregate fault probability, or `None`
/// when the probability is below the reporting threshold.
pub fn heuristic_prediction(class: AssetClass, probability: f64) -> Option<FaultPrediction> {
    if !probability.is_finite() || probability < FAULT_REPORT_THRESHOLD {
        return None;
    }
    let probability = probability.clamp(0.0, 1.0);
    let leading = fault_modes(class).first()?;
    Some(FaultPrediction {
        fault_type: leading.name.to_owned(),
        probability,
        severity: severity_for_probability(probability),
        time_to_failure_hours: None,
        affected_subpart: Some(leading.subpart.to_owned()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_class_has_fault_modes() {
        for class in AssetClass::iter() {
            assert!(!fault_modes(class).is_empty(), "{class} has no fault modes");
        }
    }

    #[test]
    fn low_probability_reports_nothing() {
        assert!(heuristic_prediction(AssetClass::Transformer, 0.54).is_none());
        assert!(heuristic_prediction(AssetClass::Transformer, f64::NAN).is_none());
    }

    #[test]
    fn severity_follows_probability() {
        let prediction = heuristic_prediction(AssetClass::CircuitBreaker, 0.93).unwrap();
        assert_eq!(prediction.fault_type, "Slow Operating Mechanism");
        assert_eq!(prediction.severity, Severity::Critical);
        assert_eq!(
            heuristic_prediction(AssetClass::Busbar, 0.6).unwrap().severity,
            Severity::Low
        );
    }
}
