//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Frame pacing statistics for playback loops."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Frame pacing statistics. Jitter is the absolute deviation of each frame
//! interval from the target period.

use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Default)]
pub struct JitterHistogram {
    samples: Mutex<Vec<f64>>,
}

impl JitterHistogram {
    pub fn record(&self, jitter: Duration) {
        let nanos = jitter.as_secs_f64() * 1_000_000_000.0;
        self.samples.lock().push(nanos);
    }

    pub fn summary(&self) -> Option<JitterSummary> {
        let samples = self.samples.lock();
        let slice = samples.as_slice();
        if slice.is_empty() {
            return None;
        }
        let count = slice.len() as f64;
        let mean = slice.iter().sum::<f64>() / count;
        let variance = if slice.len() > 1 {
            let sum_sq = slice
                .iter()
                .map(|value| {
                    let delta = value - mean;
                    delta * delta
                })
                .sum::<f64>();
            sum_sq / (count - 1.0)
        } else {
            0.0
        };
        Some(JitterSummary {
            mean_ns: mean,
            std_dev_ns: variance.sqrt(),
            max_ns: slice.iter().copied().fold(f64::MIN, f64::max),
            min_ns: slice.iter().copied().fold(f64::MAX, f64::min),
            samples: slice.len() as u64,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JitterSummary {
    pub mean_ns: f64,
    pub std_dev_ns: f64,
    pub max_ns: f64,
    pub min_ns: f64,
    pub samples: u64,
}

/// Measures frame intervals against a target period.
///
/// Timestamps come from the caller's clock as an offset from an arbitrary
/// origin, so simulated clocks produce deterministic jitter figures.
#[derive(Debug)]
pub struct FrameTimingReporter {
    target_interval: Duration,
    last_frame: Mutex<Option<Duration>>,
    histogram: JitterHistogram,
}

impl FrameTimingReporter {
    pub fn new(target_interval: Duration) -> Self {
        Self {
            target_interval,
            last_frame: Mutex::new(None),
            histogram: JitterHistogram::default(),
        }
    }

    pub fn target_interval(&self) -> Duration {
        self.target_interval
    }

    pub fn record_frame(&self, now: Duration) {
        let mut last_frame = self.last_frame.lock();
        if let Some(previous) = *last_frame {
            let actual = now.saturating_sub(previous);
            let jitter = if actual > self.target_interval {
                actual - self.target_interval
            } else {
                self.target_interval - actual
            };
            self.histogram.record(jitter);
        }
        *last_frame = Some(now);
    }

    pub fn histogram(&self) -> &JitterHistogram {
        &self.histogram
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_only_sets_the_reference() {
        let reporter = FrameTimingReporter::new(Duration::from_millis(16));
        reporter.record_frame(Duration::from_millis(5));
        assert!(reporter.histogram().summary().is_none());
    }

    #[test]
    fn jitter_is_measured_both_ways() {
        let reporter = FrameTimingReporter::new(Duration::from_millis(10));
        for at in [0, 12, 20, 30] {
            reporter.record_frame(Duration::from_millis(at));
        }
        let summary = reporter.histogram().summary().unwrap();
        assert_eq!(summary.samples, 3);
        assert_eq!(summary.min_ns, 0.0);
        assert!((summary.max_ns - 2_000_000.0).abs() < 1.0);
    }

    #[test]
    fn summary_serializes_in_camel_case() {
        let reporter = FrameTimingReporter::new(Duration::from_millis(10));
        reporter.record_frame(Duration::ZERO);
        reporter.record_frame(Duration::from_millis(11));
        let value = serde_json::to_value(reporter.histogram().summary()).unwrap();
        assert_eq!(value["samples"], 1);
        assert!((value["meanNs"].as_f64().unwrap() - 1_000_000.0).abs() < 1.0);
        assert_eq!(value["stdDevNs"], 0.0);
    }
}
