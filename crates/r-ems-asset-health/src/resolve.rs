//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Asset health analytics for simulated equipment timelines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Two-tier metric resolution.
//!
//! Upstream predictors may attach authoritative figures to a simulation
//! record. Every metric in this crate is resolved the same way: a usable
//! external value wins, otherwise the locally derived value is used, and when
//! neither exists the metric is reported as [`Source::NoData`] by the caller
//! instead of being guessed.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Where a reported metric came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Source {
    External,
    Derived,
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: Source,
}

impl<T> Resolved<T> {
    pub fn external(value: T) -> Self {
        Self {
            value,
            source: Source::External,
        }
    }

    pub fn derived(value: T) -> Self {
        Self {
            value,
            source: Source::Derived,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U> {
        Resolved {
            value: f(self.value),
            source: self.source,
        }
    }
}

/// Prefer `external`, fall back to `local`.
pub fn resolve<T>(external: Option<T>, local: Option<T>) -> Option<Resolved<T>> {
    resolve_with(external, || local)
}

/// Like [`resolve`], computing the local value only when it is needed.
pub fn resolve_with<T>(
    external: Option<T>,
    local: impl FnOnce() -> Option<T>,
) -> Option<Resolved<T>> {
    match external {
        Some(value) => Some(Resolved::external(value)),
        None => local().map(Resolved::derived),
    }
}

/// Drop non-finite figures so they never win resolution.
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_wins() {
        let resolved = resolve(Some(1.0), Some(2.0)).unwrap();
        assert_eq!(resolved.value, 1.0);
        assert_eq!(resolved.source, Source::External);
    }

    #[test]
    fn local_fallback_and_absence() {
        assert_eq!(resolve(None, Some(2.0)).map(|r| r.source), Some(Source::Derived));
        assert!(resolve::<f64>(None, None).is_none());
        assert!(resolve(finite(Some(f64::NAN)), None).is_none());
    }

    #[test]
    fn local_is_lazy() {
        let mut called = false;
        let _ = resolve_with(Some(3), || {
            called = true;
            Some(4)
        });
        assert!(!called);
    }
}
