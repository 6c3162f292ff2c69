//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Asset health analytics for simulated equipment timelines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Asset-class keyed configuration: threshold tables, health blueprints,
//! condition models, correlation pairs and nominal lifespans.
//!
//! Catalogs are validated once when they are built. Lookups afterwards are
//! infallible and a missing entry simply means "no rule for this parameter".

use std::{fs, path::Path};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::{
    condition::ConditionModel,
    correlation::CorrelationPair,
    errors::{AnalyticsError, Result},
    model::AssetClass,
    scoring::SubsystemBlueprint,
    thresholds::ParameterThreshold,
};

const BUILTIN_CATALOG: &str = include_str!("../catalog/asset_catalog.toml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProfile {
    pub base_life_months: f64,
    #[serde(default)]
    pub thresholds: IndexMap<String, ParameterThreshold>,
    #[serde(default)]
    pub subsystems: Vec<SubsystemBlueprint>,
    #[serde(default)]
    pub condition: ConditionModel,
    #[serde(default)]
    pub correlation_pairs: Vec<CorrelationPair>,
}

impl ClassProfile {
    fn validate(&self, class: AssetClass) -> Result<()> {
        if !(self.base_life_months.is_finite() && self.base_life_months > 0.0) {
            return Err(AnalyticsError::InvalidLifespan {
                class,
                months: self.base_life_months,
            });
        }
        for (parameter, threshold) in &self.thresholds {
            threshold.validate(class, parameter)?;
        }
        for blueprint in &self.subsystems {
            blueprint.validate(class)?;
        }
        self.condition.validate(class)
    }
}

/// Partial profile read from an override file.
#[derive(Debug, Clone, Default, Deserialize)]
struct ProfileOverride {
    #[serde(default)]
    base_life_months: Option<f64>,
    #[serde(default)]
    thresholds: IndexMap<String, ParameterThreshold>,
    #[serde(default)]
    subsystems: Option<Vec<SubsystemBlueprint>>,
    #[serde(default)]
    condition: Option<ConditionModel>,
    #[serde(default)]
    correlation_pairs: Option<Vec<CorrelationPair>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetCatalog {
    profiles: IndexMap<AssetClass, ClassProfile>,
}

impl AssetCatalog {
    /// Catalog shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_profiles(toml::from_str(BUILTIN_CATALOG)?)
    }

    pub fn from_profiles(profiles: IndexMap<AssetClass, ClassProfile>) -> Result<Self> {
        let catalog = Self { profiles };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Built-in catalog with the overrides in `content` merged on top.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut catalog = Self::builtin()?;
        catalog.apply_overrides(toml::from_str(content)?)?;
        Ok(catalog)
    }

    /// Built-in catalog, optionally merged with an override file.
    pub fn load(overrides: Option<&Path>) -> Result<Self> {
        match overrides {
            Some(path) => {
                debug!(catalog_path = %path.display(), "loading asset catalog overrides");
                let catalog = Self::from_toml_str(&fs::read_to_string(path)?)?;
                info!(catalog_path = %path.display(), "asset catalog overrides applied");
                Ok(catalog)
            }
            None => Self::builtin(),
        }
    }

    fn apply_overrides(&mut self, overrides: IndexMap<AssetClass, ProfileOverride>) -> Result<()> {
        for (class, patch) in overrides {
            let profile = self
                .profiles
                .get_mut(&class)
                .ok_or(AnalyticsError::MissingProfile(class))?;
            if let Some(months) = patch.base_life_months {
                profile.base_life_months = months;
            }
            profile.thresholds.extend(patch.thresholds);
            if let Some(subsystems) = patch.subsystems {
                profile.subsystems = subsystems;
            }
            if let Some(condition) = patch.condition {
                profile.condition = condition;
            }
            if let Some(pairs) = patch.correlation_pairs {
                profile.correlation_pairs = pairs;
            }
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        for class in AssetClass::iter() {
            self.profiles
                .get(&class)
                .ok_or(AnalyticsError::MissingProfile(class))?
                .validate(class)?;
        }
        Ok(())
    }

    pub fn profile(&self, class: AssetClass) -> Option<&ClassProfile> {
        self.profiles.get(&class)
    }

    pub fn threshold(&self, class: AssetClass, parameter: &str) -> Option<&ParameterThreshold> {
        self.profile(class)?.thresholds.get(parameter)
    }

    pub fn base_life_months(&self, class: AssetClass) -> Option<f64> {
        self.profile(class).map(|profile| profile.base_life_months)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thresholds::Direction;

    #[test]
    fn builtin_catalog_covers_every_class() {
        let catalog = AssetCatalog::builtin().unwrap();
        for class in AssetClass::iter() {
            let profile = catalog.profile(class).unwrap();
            assert!(!profile.thresholds.is_empty());
            assert!(!profile.subsystems.is_empty());
            assert!(!profile.condition.stress.is_empty());
            assert!(!profile.condition.fault.is_empty());
            assert!(!profile.correlation_pairs.is_empty());
        }
        let sf6 = catalog
            .threshold(AssetClass::CircuitBreaker, "sf6Pressure")
            .unwrap();
        assert_eq!(sf6.direction, Direction::Low);
        assert_eq!(catalog.base_life_months(AssetClass::Transformer), Some(480.0));
    }

    #[test]
    fn overrides_merge_over_builtin() {
        let catalog = AssetCatalog::from_toml_str(
            r#"
            [transformer]
            base_life_months = 400.0

            [transformer.thresholds]
            oilTemperature = { warning = 80.0, critical = 95.0, direction = "high", unit = "°C" }
            "#,
        )
        .unwrap();
        let oil = catalog
            .threshold(AssetClass::Transformer, "oilTemperature")
            .unwrap();
        assert_eq!(oil.warning, 80.0);
        assert!(catalog
            .threshold(AssetClass::Transformer, "windingTemperature")
            .is_some());
        assert_eq!(catalog.base_life_months(AssetClass::Transformer), Some(400.0));
    }

    #[test]
    fn invalid_overrides_are_rejected_at_load() {
        let err = AssetCatalog::from_toml_str(
            r#"
            [busbar.thresholds]
            busVoltage = { warning = 380.0, critical = 390.0, direction = "low" }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidThreshold { .. }));

        let err = AssetCatalog::from_toml_str("[isolator]\nbase_life_months = 0.0\n").unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidLifespan { .. }));

        let err = AssetCatalog::from_toml_str("[busbar.condition]\naging_weight = 2.0\n").unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidConditionModel { .. }));
    }

    #[test]
    fn unknown_class_is_a_parse_error() {
        assert!(matches!(
            AssetCatalog::from_toml_str("[reactor]\nbase_life_months = 10.0\n"),
            Err(AnalyticsError::CatalogParseFailed(_))
        ));
    }
}
