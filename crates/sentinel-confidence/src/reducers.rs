//! The required reducer table: deterministic confidence-lowering
//! rules. Modeled as tagged data plus a dispatch table, rather than trait
//! objects, so synthetic reducers are trivial to build in tests.

use std::sync::OnceLock;

use regex::Regex;
use sentinel_state::SessionState;

use crate::constants::{
    GOAL_DRIFT_MIN_TURNS, GOAL_DRIFT_OVERLAP_THRESHOLD, LARGE_DIFF_LINE_THRESHOLD,
    SUNK_COST_EDIT_THRESHOLD,
};
use crate::context::TurnContext;

pub struct Reducer {
    pub name: &'static str,
    pub delta: i32,
    pub cooldown_seconds: i64,
    pub matcher: fn(&TurnContext, &SessionState) -> bool,
    pub subkey: fn(&TurnContext) -> Option<String>,
}

fn no_subkey(_ctx: &TurnContext) -> Option<String> {
    None
}

fn path_subkey(ctx: &TurnContext) -> Option<String> {
    ctx.edited_path.clone()
}

fn check_subkey(ctx: &TurnContext) -> Option<String> {
    ctx.hook_blocked_check.clone()
}

fn user_correction_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(no,? that'?s wrong|that'?s not (what|right)|not what i asked|you misunderstood|that'?s incorrect)\b").unwrap()
    })
}

fn apologetic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(i apologize|sorry for|my mistake|you'?re absolutely right)\b").unwrap()
    })
}

fn overconfident_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(definitely fixed|this (will|should) definitely work|guaranteed to work|that fixes it)\b").unwrap()
    })
}

fn deferral_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(todo later|i'?ll handle (this|that) later|for now,? let'?s skip)\b").unwrap())
}

fn deadend_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(i'?m not able to|this can'?t be done|giving up|i (can'?t|cannot) figure (this|it) out)\b").unwrap())
}

fn tool_failure_streak(ctx: &TurnContext, state: &SessionState) -> bool {
    ctx.tool_succeeded == Some(false) && state.consecutive_failures >= 1
}

fn cascade_block(ctx: &TurnContext, state: &SessionState) -> bool {
    match &ctx.hook_blocked_check {
        Some(name) => state.consecutive_blocks.get(name).copied().unwrap_or(0) >= 2,
        None => false,
    }
}

fn sunk_cost(ctx: &TurnContext, state: &SessionState) -> bool {
    match &ctx.edited_path {
        Some(path) => {
            state.edit_counts.get(path).copied().unwrap_or(0) >= SUNK_COST_EDIT_THRESHOLD as u64
                && !ctx.is_test_command
        }
        None => false,
    }
}

fn edit_oscillation(ctx: &TurnContext, state: &SessionState) -> bool {
    match (&ctx.edited_path, &ctx.edit_region_hash) {
        (Some(path), Some(hash)) => {
            state.edit_history.get(path) == Some(hash)
                && state.edit_counts.get(path).copied().unwrap_or(0) >= 2
        }
        _ => false,
    }
}

fn goal_drift(ctx: &TurnContext, state: &SessionState) -> bool {
    let Some(goal_turn) = state.goal_set_turn else {
        return false;
    };
    if state.turn_count < goal_turn + GOAL_DRIFT_MIN_TURNS as u64 {
        return false;
    }
    let Some(prompt) = &ctx.prompt_text else {
        return false;
    };
    if state.goal_keywords.is_empty() {
        return false;
    }
    let overlap = crate::overlap_ratio(prompt, &state.goal_keywords);
    overlap < GOAL_DRIFT_OVERLAP_THRESHOLD
}

fn backup_file_creation(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.created_backup_file
}

fn version_suffixed_filename(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.created_version_suffixed_file
}

fn user_correction(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.prompt_text
        .as_deref()
        .map(|t| user_correction_re().is_match(t))
        .unwrap_or(false)
}

fn apologetic_language(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.assistant_text
        .as_deref()
        .map(|t| apologetic_re().is_match(t))
        .unwrap_or(false)
}

fn overconfident_completion(ctx: &TurnContext, _state: &SessionState) -> bool {
    !ctx.is_test_command
        && ctx
            .assistant_text
            .as_deref()
            .map(|t| overconfident_re().is_match(t))
            .unwrap_or(false)
}

fn large_diff(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.changed_line_count
        .map(|n| n >= LARGE_DIFF_LINE_THRESHOLD)
        .unwrap_or(false)
}

fn standalone_markdown_file(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.created_standalone_markdown
}

fn hook_block(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.hook_blocked_check.is_some()
}

fn unresolved_anti_pattern_persistence(_ctx: &TurnContext, state: &SessionState) -> bool {
    state.errors_unresolved.len() >= 2
}

fn deferral(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.assistant_text
        .as_deref()
        .map(|t| deferral_re().is_match(t))
        .unwrap_or(false)
}

fn deadend_response(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.assistant_text
        .as_deref()
        .map(|t| deadend_re().is_match(t))
        .unwrap_or(false)
}

pub const REDUCERS: &[Reducer] = &[
    Reducer { name: "tool_failure_streak", delta: -8, cooldown_seconds: 30, matcher: tool_failure_streak, subkey: no_subkey },
    Reducer { name: "cascade_block", delta: -6, cooldown_seconds: 60, matcher: cascade_block, subkey: check_subkey },
    Reducer { name: "sunk_cost", delta: -5, cooldown_seconds: 120, matcher: sunk_cost, subkey: path_subkey },
    Reducer { name: "edit_oscillation", delta: -8, cooldown_seconds: 90, matcher: edit_oscillation, subkey: path_subkey },
    Reducer { name: "goal_drift", delta: -4, cooldown_seconds: 300, matcher: goal_drift, subkey: no_subkey },
    Reducer { name: "backup_file_creation", delta: -3, cooldown_seconds: 60, matcher: backup_file_creation, subkey: no_subkey },
    Reducer { name: "version_suffixed_filename", delta: -3, cooldown_seconds: 60, matcher: version_suffixed_filename, subkey: no_subkey },
    Reducer { name: "user_correction", delta: -5, cooldown_seconds: 30, matcher: user_correction, subkey: no_subkey },
    Reducer { name: "apologetic_language", delta: -3, cooldown_seconds: 30, matcher: apologetic_language, subkey: no_subkey },
    Reducer { name: "overconfident_completion", delta: -6, cooldown_seconds: 60, matcher: overconfident_completion, subkey: no_subkey },
    Reducer { name: "large_diff", delta: -5, cooldown_seconds: 60, matcher: large_diff, subkey: no_subkey },
    Reducer { name: "standalone_markdown_file", delta: -2, cooldown_seconds: 60, matcher: standalone_markdown_file, subkey: no_subkey },
    Reducer { name: "hook_block", delta: -4, cooldown_seconds: 10, matcher: hook_block, subkey: check_subkey },
    Reducer { name: "unresolved_anti_pattern_persistence", delta: -4, cooldown_seconds: 180, matcher: unresolved_anti_pattern_persistence, subkey: no_subkey },
    Reducer { name: "deferral", delta: -3, cooldown_seconds: 60, matcher: deferral, subkey: no_subkey },
    Reducer { name: "deadend_response", delta: -7, cooldown_seconds: 120, matcher: deadend_response, subkey: no_subkey },
];

pub fn find(name: &str) -> Option<&'static Reducer> {
    REDUCERS.iter().find(|r| r.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_state() -> SessionState {
        SessionState::new("s", "p", "/tmp/p")
    }

    #[test]
    fn test_all_required_reducers_present() {
        let names: Vec<&str> = REDUCERS.iter().map(|r| r.name).collect();
        for expected in [
            "tool_failure_streak",
            "cascade_block",
            "sunk_cost",
            "edit_oscillation",
            "goal_drift",
            "backup_file_creation",
            "version_suffixed_filename",
            "user_correction",
            "apologetic_language",
            "overconfident_completion",
            "large_diff",
            "standalone_markdown_file",
            "hook_block",
            "unresolved_anti_pattern_persistence",
            "deferral",
            "deadend_response",
        ] {
            assert!(names.contains(&expected), "missing reducer {expected}");
        }
    }

    #[test]
    fn test_sunk_cost_requires_threshold_edits() {
        let mut state = fresh_state();
        let mut ctx = TurnContext::new();
        ctx.edited_path = Some("/proj/a.py".into());
        state.edit_counts.insert("/proj/a.py".into(), 2);
        assert!(!sunk_cost(&ctx, &state));
        state.edit_counts.insert("/proj/a.py".into(), 3);
        assert!(sunk_cost(&ctx, &state));
    }

    #[test]
    fn test_user_correction_matches_common_phrasing() {
        let mut ctx = TurnContext::new();
        ctx.prompt_text = Some("no, that's wrong, I wanted the other file changed".into());
        assert!(user_correction(&ctx, &fresh_state()));
    }

    #[test]
    fn test_hook_block_vs_cascade_block_distinction() {
        let mut ctx = TurnContext::new();
        ctx.hook_blocked_check = Some("gap_detector".into());
        let mut state = fresh_state();
        assert!(hook_block(&ctx, &state));
        assert!(!cascade_block(&ctx, &state));
        state.consecutive_blocks.insert("gap_detector".into(), 2);
        assert!(cascade_block(&ctx, &state));
    }

    #[test]
    fn test_goal_drift_requires_min_turns_elapsed() {
        let mut state = fresh_state();
        state.set_goal("fix the retry bug", vec!["fix".into(), "retry".into(), "bug".into()], 1);
        state.turn_count = 3;
        let mut ctx = TurnContext::new();
        ctx.prompt_text = Some("what's the weather like".into());
        assert!(!goal_drift(&ctx, &state));
        state.turn_count = 10;
        assert!(goal_drift(&ctx, &state));
    }
}
