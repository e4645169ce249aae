//! Dispute handling: `FP:<reducer>` / `/dispute <reducer>` parsing
//! and the false-positive bookkeeping that stretches future cooldowns.

use std::sync::OnceLock;

use regex::Regex;
use sentinel_state::SessionState;

use crate::constants::{FP_COOLDOWN_STRETCH_CAP, FP_COOLDOWN_STRETCH_PER_COUNT, MAX_CONFIDENCE_DELTA_PER_TURN};
use crate::reducers;

fn dispute_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*(?:FP:|/dispute\s+)(\w+)").unwrap())
}

/// Parses a dispute target out of a user prompt, if present.
pub fn parse(prompt: &str) -> Option<String> {
    dispute_re()
        .captures(prompt)
        .map(|c| c[1].to_string())
}

/// Cooldown multiplier for a reducer with `fp_count` recorded false
/// positives: `1 + 0.5 * fp_count`, capped at 4x.
pub fn cooldown_stretch(fp_count: u32) -> f64 {
    (1.0 + FP_COOLDOWN_STRETCH_PER_COUNT * fp_count as f64).min(FP_COOLDOWN_STRETCH_CAP)
}

/// Whether `name` is still eligible for a dispute: at most one dispute is
/// honored per reducer per session until it fires again for real. We track
/// this with the existing trigger/fp-count maps rather than a new field —
/// a dispute is available exactly when the reducer has fired more times
/// than it's been disputed.
pub fn is_eligible(state: &SessionState, name: &str) -> bool {
    let triggers = state.reducer_triggers.get(name).copied().unwrap_or(0);
    let disputes = state.reducer_fp_counts.get(name).copied().unwrap_or(0);
    triggers > 0 && disputes < triggers
}

/// Applies an accepted dispute: restores the reducer's delta magnitude
/// (clipped to the per-turn rate limit), bumps `fp_count`, and returns the
/// confidence delta to apply this turn.
pub fn apply(state: &mut SessionState, name: &str, turn: u64) -> Option<i32> {
    if !is_eligible(state, name) {
        return None;
    }
    let reducer = reducers::find(name)?;
    let restore = reducer.delta.unsigned_abs().min(MAX_CONFIDENCE_DELTA_PER_TURN as u32) as i32;

    *state.reducer_fp_counts.entry(name.to_string()).or_insert(0) += 1;
    state.push_evidence(
        "dispute_accepted",
        &format!("{name}: restored {restore}"),
        turn,
    );
    Some(restore)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fp_prefix() {
        assert_eq!(
            parse("FP:edit_oscillation legitimate refactor").as_deref(),
            Some("edit_oscillation")
        );
    }

    #[test]
    fn test_parse_slash_dispute() {
        assert_eq!(parse("/dispute sunk_cost false alarm").as_deref(), Some("sunk_cost"));
    }

    #[test]
    fn test_parse_no_match() {
        assert!(parse("please fix the bug").is_none());
    }

    #[test]
    fn test_cooldown_stretch_caps_at_4x() {
        assert_eq!(cooldown_stretch(0), 1.0);
        assert_eq!(cooldown_stretch(2), 2.0);
        assert_eq!(cooldown_stretch(100), FP_COOLDOWN_STRETCH_CAP);
    }

    #[test]
    fn test_dispute_bounded_to_one_per_firing() {
        let mut state = SessionState::new("s", "p", "/tmp/p");
        state.reducer_triggers.insert("edit_oscillation".into(), 1);
        assert!(is_eligible(&state, "edit_oscillation"));

        let delta = apply(&mut state, "edit_oscillation", 1);
        assert_eq!(delta, Some(8));
        assert!(!is_eligible(&state, "edit_oscillation"));
        assert!(apply(&mut state, "edit_oscillation", 2).is_none());

        // A genuine refiring unlocks one more dispute.
        state.reducer_triggers.insert("edit_oscillation".into(), 2);
        assert!(is_eligible(&state, "edit_oscillation"));
    }
}
