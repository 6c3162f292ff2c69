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
use statrs::statistics::Statistics;
use tracing::debug;

use crate::{
    catalog::AssetCatalog,
    model::{numeric, AssetClass, CorrelationStrength, TimelineStep},
    resolve::{finite, resolve_with, Source},
};

pub const DEFAULT_MAX_INSIGHTS: usize = 4;
pub const DEFAULT_MIN_PAIRED_SAMPLES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub a: String,
    pub b: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationInsight {
    pub label: String,
    pub description: String,
    pub value: f64,
    pub parameters: [String; 2],
    pub source: Source,
}

#[derive(Debug, Clone, Copy)]
pub struct CorrelationLimits {
    pub max_insights: usize,
    pub min_paired_samples: usize,
}

impl Default for CorrelationLimits {
    fn default() -> Self {
        Self {
            max_insights: DEFAULT_MAX_INSIGHTS,
            min_paired_samples: DEFAULT_MIN_PAIRED_SAMPLES,
        }
    }
}

/// Pearson correlation of two equally long series.
///
/// Constant series have no defined correlation and yield 0.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mean_a = a.iter().mean();
    let mean_b = b.iter().mean();
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    let r = cov / (var_a * var_b).sqrt();
    if r.is_finite() {
        r.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Values of `a` and `b` from the steps where both are finite numbers.
pub fn paired_series(timeline: &[TimelineStep], a: &str, b: &str) -> (Vec<f64>, Vec<f64>) {
    timeline
        .iter()
        .filter_map(|step| Some((numeric(&step.state, a)?, numeric(&step.state, b)?)))
        .unzip()
}

fn describe(pair: &CorrelationPair, value: f64) -> String {
    let strength = match value.abs() {
        v if v >= 0.7 => "Strong",
        v if v >= 0.4 => "Moderate",
        _ => "Weak",
    };
    let direction = if value < 0.0 { "inverse" } else { "positive" };
    format!(
        "{} {} association between {} and {} (r = {:.2})",
        strength, direction, pair.a, pair.b, value
    )
}

#[derive(Debug, Clone, Copy)]
pub struct CorrelationAnalyzer<'a> {
    catalog: &'a AssetCatalog,
    limits: CorrelationLimits,
}

impl<'a> CorrelationAnalyzer<'a> {
    pub fn new(catalog: &'a AssetCatalog) -> Self {
        Self {
            catalog,
            limits: CorrelationLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: CorrelationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn correlate(&self, class: AssetClass, timeline: &[TimelineStep]) -> Vec<CorrelationInsight> {
        self.correlate_with(class, timeline, &[])
    }

    /// Rank the class's correlation pairs by strength. A precomputed strength
    /// from `external` replaces the locally computed coefficient for its pair.
    pub fn correlate_with(
        &self,
        class: AssetClass,
        timeline: &[TimelineStep],
        external: &[CorrelationStrength],
    ) -> Vec<CorrelationInsight> {
        let Some(profile) = self.catalog.profile(class) else {
            return Vec::new();
        };
        let mut insights: Vec<CorrelationInsight> = profile
            .correlation_pairs
            .iter()
            .filter_map(|pair| {
                let supplied = finite(
                    external
                        .iter()
                        .find(|strength| strength.matches(&pair.a, &pair.b))
                        .map(|strength| strength.strength),
                );
                let resolved = resolve_with(supplied, || {
                    let (a, b) = paired_series(timeline, &pair.a, &pair.b);
                    if a.len() < self.limits.min_paired_samples {
                        debug!(a = %pair.a, b = %pair.b, samples = a.len(), "skipping sparse correlation pair");
                        return None;
                    }
                    Some(pearson(&a, &b))
                })?;
                let value = resolved.value.clamp(-1.0, 1.0);
                let label = if pair.label.is_empty() {
                    format!("{} vs {}", pair.a, pair.b)
                } else {
                    pair.label.clone()
                };
                Some(CorrelationInsight {
                    label,
                    description: describe(pair, value),
                    value,
                    parameters: [pair.a.clone(), pair.b.clone()],
                    source: resolved.source,
                })
            })
            .collect();

        insights.sort_by(|x, y| y.value.abs().total_cmp(&x.value.abs()));
        insights.truncate(self.limits.max_insights);
        insights
    }
}
