//! Momentum system: streak multipliers, diminishing returns on
//! farmable signals, and trajectory prediction.

use std::collections::HashMap;

use crate::constants::{
    DIMINISHING_CAP, DIMINISHING_MULTIPLIERS, FARMABLE_INCREASERS, STREAK_MULTIPLIERS,
};

/// Multiplier applied to this turn's positive delta, given the streak count
/// carried in from prior turns. The streak counts consecutive successful
/// turns *before* this one; this turn is position `streak + 1` in that run.
pub fn streak_multiplier(streak: u32) -> f64 {
    let position = streak + 1;
    STREAK_MULTIPLIERS
        .iter()
        .rev()
        .find(|(threshold, _)| position >= *threshold)
        .map(|(_, mult)| *mult)
        .unwrap_or(1.0)
}

/// Whether `name` is subject to diminishing returns at all.
pub fn is_farmable(name: &str) -> bool {
    FARMABLE_INCREASERS.contains(&name)
}

/// Multiplier for the `nth` (1-based) occurrence of a farmable signal within
/// its rolling window.
pub fn diminishing_multiplier(nth: u32) -> f64 {
    if nth >= DIMINISHING_CAP {
        return 0.0;
    }
    DIMINISHING_MULTIPLIERS
        .iter()
        .rev()
        .find(|(count, _)| nth >= *count)
        .map(|(_, mult)| *mult)
        .unwrap_or(1.0)
}

/// Records one occurrence of a farmable increaser and returns the multiplier
/// that should apply to it.
pub fn record_farmable_occurrence(counters: &mut HashMap<String, u32>, name: &str) -> f64 {
    let count = counters.entry(name.to_string()).or_insert(0);
    *count += 1;
    diminishing_multiplier(*count)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryWarning {
    pub threshold: i32,
    pub turns_until: u32,
    pub rising: bool,
}

/// Given the last several turns' applied deltas and the current confidence,
/// predicts whether a linear continuation of the recent average rate would
/// cross `threshold` within `max_turns`. Returns `None` if the trend doesn't
/// cross in that window, or if there's no clear trend (empty/zero-average
/// history).
pub fn predict_crossing(
    recent_deltas: &[i32],
    current_confidence: i32,
    threshold: i32,
    max_turns: u32,
) -> Option<TrajectoryWarning> {
    if recent_deltas.is_empty() {
        return None;
    }
    let avg = recent_deltas.iter().sum::<i32>() as f64 / recent_deltas.len() as f64;
    if avg == 0.0 {
        return None;
    }

    let rising = avg > 0.0;
    if rising && current_confidence >= threshold {
        return None;
    }
    if !rising && current_confidence <= threshold {
        return None;
    }

    let gap = (threshold - current_confidence) as f64;
    let turns_needed = (gap / avg).abs().ceil();
    if turns_needed > max_turns as f64 {
        return None;
    }

    Some(TrajectoryWarning {
        threshold,
        turns_until: turns_needed as u32,
        rising,
    })
}
