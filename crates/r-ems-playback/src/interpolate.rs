//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Timeline playback for simulated asset histories."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Blending between timeline steps.
//!
//! Numeric parameters (including numeric-looking text) are interpolated
//! linearly. Anything else snaps to the nearer side: the earlier step while
//! the ratio is below one half, the later step from one half on. A key the
//! chosen side does not carry is left out of the result.

use r_ems_asset_health::model::{HealthMetrics, ParamValue, ParameterState, TimelineStep};

fn clamp01(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn lerp(a: f64, b: f64, ratio: f64) -> f64 {
    a + (b - a) * ratio
}

fn pick_side<'a>(
    previous: Option<&'a ParamValue>,
    next: Option<&'a ParamValue>,
    ratio: f64,
) -> Option<&'a ParamValue> {
    if ratio < 0.5 {
        previous
    } else {
        next
    }
}

/// Blend two parameter states. Keys keep the order of `previous`, followed by
/// keys only `next` carries.
pub fn blend_states(previous: &ParameterState, next: &ParameterState, ratio: f64) -> ParameterState {
    let ratio = clamp01(ratio);
    let keys = previous
        .keys()
        .chain(next.keys().filter(|key| !previous.contains_key(*key)));

    let mut blended = ParameterState::with_capacity(previous.len().max(next.len()));
    for key in keys {
        let (a, b) = (previous.get(key), next.get(key));
        let numeric = a
            .and_then(ParamValue::as_number)
            .zip(b.and_then(ParamValue::as_number));
        let value = match numeric {
            Some((a, b)) => Some(ParamValue::Number(lerp(a, b, ratio))),
            None => pick_side(a, b, ratio).cloned(),
        };
        if let Some(value) = value {
            blended.insert(key.clone(), value);
        }
    }
    blended
}

pub fn blend_metrics(previous: HealthMetrics, next: HealthMetrics, ratio: f64) -> HealthMetrics {
    let ratio = clamp01(ratio);
    HealthMetrics {
        true_health: lerp(previous.true_health, next.true_health, ratio),
        stress_score: lerp(previous.stress_score, next.stress_score, ratio),
        fault_probability: lerp(previous.fault_probability, next.fault_probability, ratio),
        aging_factor: lerp(previous.aging_factor, next.aging_factor, ratio),
    }
}

/// Steps bracketing `target` and the blend ratio between them.
fn bracket(timeline: &[TimelineStep], target: f64) -> Option<(usize, usize, f64)> {
    let last = timeline.len().checked_sub(1)?;
    let previous = timeline
        .iter()
        .rposition(|step| step.time <= target)
        .unwrap_or(0);
    let next = timeline
        .iter()
        .position(|step| step.time >= target)
        .unwrap_or(last);
    let (t0, t1) = (timeline[previous].time, timeline[next].time);
    if previous >= next || t1 <= t0 {
        return Some((previous, previous, 0.0));
    }
    Some((previous, next, clamp01((target - t0) / (t1 - t0))))
}

fn target_time(timeline: &[TimelineStep], progress: f64) -> Option<f64> {
    let (first, last) = (timeline.first()?.time, timeline.last()?.time);
    let progress = clamp01(progress);
    Some(if progress >= 1.0 {
        last
    } else {
        first + progress * (last - first)
    })
}

/// State at `progress` (0 = first step, 1 = last step) through the timeline.
/// An empty timeline yields an empty state.
pub fn interpolate(timeline: &[TimelineStep], progress: f64) -> ParameterState {
    match target_time(timeline, progress) {
        Some(time) => interpolate_at(timeline, time),
        None => ParameterState::new(),
    }
}

/// State at simulation time `time`, clamped to the timeline's span.
pub fn interpolate_at(timeline: &[TimelineStep], time: f64) -> ParameterState {
    match bracket(timeline, time) {
        Some((previous, next, _)) if previous == next => timeline[previous].state.clone(),
        Some((previous, next, ratio)) => {
            blend_states(&timeline[previous].state, &timeline[next].state, ratio)
        }
        None => ParameterState::new(),
    }
}

/// Condition channels at `progress`, missing channels read as the baseline.
pub fn interpolate_metrics(timeline: &[TimelineStep], progress: f64) -> HealthMetrics {
    let bracketed = target_time(timeline, progress).and_then(|time| bracket(timeline, time));
    match bracketed {
        Some((previous, next, ratio)) => blend_metrics(
            timeline[previous].metrics(),
            timeline[next].metrics(),
            ratio,
        ),
        None => HealthMetrics::BASELINE,
    }
}
