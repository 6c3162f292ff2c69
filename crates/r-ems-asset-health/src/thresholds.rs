//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Asset health analytics for simulated equipment timelines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::AssetCatalog,
    errors::{AnalyticsError, Result},
    model::{AssetClass, ParamValue, ParameterState, Severity},
};

/// Which side of the operating band is dangerous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterThreshold {
    pub warning: f64,
    pub critical: f64,
    pub direction: Direction,
    #[serde(default)]
    pub unit: String,
}

impl ParameterThreshold {
    pub fn high(warning: f64, critical: f64, unit: &str) -> Self {
        Self {
            warning,
            critical,
            direction: Direction::High,
            unit: unit.to_owned(),
        }
    }

    pub fn low(warning: f64, critical: f64, unit: &str) -> Self {
        Self {
            warning,
            critical,
            direction: Direction::Low,
            unit: unit.to_owned(),
        }
    }

    pub fn validate(&self, class: AssetClass, parameter: &str) -> Result<()> {
        let invalid = |reason: String| AnalyticsError::InvalidThreshold {
            class,
            parameter: parameter.to_owned(),
            reason,
        };
        if !self.warning.is_finite() || !self.critical.is_finite() {
            return Err(invalid("warning and critical must be finite".into()));
        }
        match self.direction {
            Direction::High if self.critical < self.warning => Err(invalid(format!(
                "critical {} below warning {} for a high threshold",
                self.critical, self.warning
            ))),
            Direction::Low if self.critical > self.warning => Err(invalid(format!(
                "critical {} above warning {} for a low threshold",
                self.critical, self.warning
            ))),
            _ => Ok(()),
        }
    }

    /// Severity band for a numeric reading.
    pub fn classify(&self, value: f64) -> Severity {
        match self.direction {
            Direction::High => {
                if value >= self.critical {
                    Severity::Critical
                } else if value >= self.warning {
                    Severity::High
                } else if value >= self.warning * 9.0 / 10.0 {
                    Severity::Medium
                } else {
                    Severity::Normal
                }
            }
            Direction::Low => {
                if value <= self.critical {
                    Severity::Critical
                } else if value <= self.warning {
                    Severity::High
                } else if value <= self.warning + (self.warning - self.critical) * 3.0 / 10.0 {
                    Severity::Medium
                } else {
                    Severity::Normal
                }
            }
        }
    }
}

/// Classifies raw parameter readings against the catalog's threshold tables.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdEvaluator<'a> {
    catalog: &'a AssetCatalog,
}

impl<'a> ThresholdEvaluator<'a> {
    pub fn new(catalog: &'a AssetCatalog) -> Self {
        Self { catalog }
    }

    /// Severity of `raw`, substituting `fallback` for non-numeric input.
    /// Parameters without a threshold are always [`Severity::Normal`].
    pub fn evaluate(
        &self,
        class: AssetClass,
        parameter: &str,
        raw: &ParamValue,
        fallback: f64,
    ) -> Severity {
        match self.catalog.threshold(class, parameter) {
            Some(threshold) => threshold.classify(raw.number_or(fallback)),
            None => Severity::Normal,
        }
    }

    /// Like [`evaluate`](Self::evaluate) but treats non-numeric input as absent.
    pub fn evaluate_present(
        &self,
        class: AssetClass,
        parameter: &str,
        raw: &ParamValue,
    ) -> Option<Severity> {
        let value = raw.as_number()?;
        Some(
            self.catalog
                .threshold(class, parameter)
                .map(|threshold| threshold.classify(value))
                .unwrap_or(Severity::Normal),
        )
    }

    /// Severities for every thresholded, numeric parameter in `state`.
    pub fn evaluate_state(
        &self,
        class: AssetClass,
        state: &ParameterState,
    ) -> IndexMap<String, Severity> {
        state
            .iter()
            .filter(|(key, _)| self.catalog.threshold(class, key).is_some())
            .filter_map(|(key, raw)| {
                self.evaluate_present(class, key, raw)
                    .map(|severity| (key.clone(), severity))
            })
            .collect()
    }
}
