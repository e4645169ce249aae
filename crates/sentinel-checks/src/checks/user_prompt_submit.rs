//! UserPromptSubmit checks: gating — a `Deny` here blocks the prompt
//! before the assistant ever sees it, so these stay conservative and mostly
//! inject context instead.

use sentinel_confidence::constants::{GOAL_DRIFT_OVERLAP_THRESHOLD, ROCK_BOTTOM_RECOVERY_TARGET};
use sentinel_core::patterns;
use sentinel_core::Tier;

const REALIGNMENT_MARKER: &str = "realignment:";
const REALIGNMENT_QUESTIONS: &str = "confidence has collapsed to the IGNORANCE tier. Before continuing: what was the original goal, what has been tried so far, and what concretely will change this time? Prefix your next prompt with 'realignment:' once you've answered those.";

use crate::event::CheckOutcome;
use crate::registry::{Check, CheckContext, CheckRegistry, ToolFilter};

/// Anchors the session's goal on the first substantive prompt, then warns
/// (never denies) when a later prompt drifts far from it.
fn goal_anchor(ctx: &mut CheckContext) -> CheckOutcome {
    let Some(prompt) = ctx.event.prompt.as_deref() else {
        return CheckOutcome::allow();
    };
    if patterns::is_trivial_prompt(prompt) {
        return CheckOutcome::allow();
    }

    if ctx.state.original_goal.is_none() {
        let keywords = patterns::extract_goal_keywords(prompt);
        ctx.state.set_goal(prompt, keywords, ctx.turn);
        return CheckOutcome::allow();
    }

    let turns_since_goal = ctx.state.goal_set_turn.map(|set_turn| ctx.turn.saturating_sub(set_turn)).unwrap_or(0);
    let overlap = sentinel_confidence::overlap_ratio(prompt, &ctx.state.goal_keywords);
    if overlap < GOAL_DRIFT_OVERLAP_THRESHOLD && turns_since_goal >= 5 {
        CheckOutcome::allow_with(format!(
            "this prompt shares little vocabulary with the original goal ({}); confirm this is an intentional pivot",
            ctx.state.original_goal.as_deref().unwrap_or("<unset>")
        ))
    } else {
        CheckOutcome::allow()
    }
}

/// Denies the prompt outright once confidence has collapsed into the
/// IGNORANCE tier, until the prompt carries the realignment marker — the
/// question-template gate forcing an explicit stock-take before continuing.
/// Completing realignment resets confidence to the fixed recovery target
/// rather than letting the normal engine pipeline ease it back up.
fn rock_bottom_realignment(ctx: &mut CheckContext) -> CheckOutcome {
    if Tier::from_confidence(ctx.state.confidence) != Tier::Ignorance {
        return CheckOutcome::allow();
    }
    let prompt = ctx.event.prompt.as_deref().unwrap_or("");
    if !prompt.to_lowercase().contains(REALIGNMENT_MARKER) {
        return CheckOutcome::deny(REALIGNMENT_QUESTIONS);
    }
    ctx.state.confidence = ROCK_BOTTOM_RECOVERY_TARGET;
    ctx.state.push_evidence("rock_bottom_realignment_complete", prompt, ctx.turn);
    CheckOutcome::allow_with("realignment accepted; confidence reset to the recovery baseline")
}

/// Suggests extended thinking for prompts that read as architecturally
/// ambiguous or unusually long, mirroring the original hook's heuristic
/// that complex asks benefit from an explicit planning pass.
fn thinking_suggester(ctx: &mut CheckContext) -> CheckOutcome {
    let Some(prompt) = ctx.event.prompt.as_deref() else {
        return CheckOutcome::allow();
    };
    let looks_architectural = ["design", "architecture", "refactor", "migrate", "tradeoff"]
        .iter()
        .any(|kw| prompt.to_lowercase().contains(kw));
    if looks_architectural || prompt.len() > 600 {
        CheckOutcome::allow_with("this looks like it could benefit from extended thinking before acting")
    } else {
        CheckOutcome::allow()
    }
}

pub fn register(registry: &mut CheckRegistry) {
    registry.register_user_prompt_submit(Check { name: "goal_anchor", priority: 1, tool_filter: ToolFilter::Any, run: goal_anchor });
    registry.register_user_prompt_submit(Check { name: "rock_bottom_realignment", priority: 3, tool_filter: ToolFilter::Any, run: rock_bottom_realignment });
    registry.register_user_prompt_submit(Check { name: "thinking_suggester", priority: 60, tool_filter: ToolFilter::Any, run: thinking_suggester });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HookSettings;
    use crate::event::EventEnvelope;
    use chrono::Utc;
    use sentinel_lock::cooldown::CooldownStore;
    use sentinel_state::SessionState;

    fn envelope(prompt: &str) -> EventEnvelope {
        EventEnvelope {
            session_id: "sess-1".into(),
            transcript_path: None,
            hook_event_name: "UserPromptSubmit".into(),
            permission_mode: None,
            tool_name: None,
            tool_input: None,
            tool_output: None,
            tool_error: None,
            prompt: Some(prompt.to_string()),
            stop_hook_active: None,
            notification_type: None,
            message: None,
        }
    }

    #[test]
    fn test_goal_anchor_sets_goal_on_first_substantive_prompt() {
        let event = envelope("fix the flaky retry test in the worker pool");
        let mut state = SessionState::new("s", "p", "/tmp/p");
        let mut cooldowns = CooldownStore::load(&std::path::PathBuf::from("/tmp/no-such-c.json"));
        let settings = HookSettings::default();
        let mut ctx = CheckContext { event: &event, state: &mut state, cooldowns: &mut cooldowns, settings: &settings, turn: 1, now: Utc::now() };
        goal_anchor(&mut ctx);
        assert!(state.original_goal.is_some());
    }

    #[test]
    fn test_goal_anchor_warns_on_drift() {
        let mut state = SessionState::new("s", "p", "/tmp/p");
        state.set_goal("fix the flaky retry test", vec!["fix".into(), "retry".into(), "test".into()], 1);
        let event = envelope("what's a good recipe for lasagna");
        let mut cooldowns = CooldownStore::load(&std::path::PathBuf::from("/tmp/no-such-d.json"));
        let settings = HookSettings::default();
        let mut ctx = CheckContext { event: &event, state: &mut state, cooldowns: &mut cooldowns, settings: &settings, turn: 6, now: Utc::now() };
        let outcome = goal_anchor(&mut ctx);
        assert!(matches!(outcome, CheckOutcome::Allow { context: Some(_) }));
    }

    #[test]
    fn test_goal_anchor_does_not_warn_before_five_turns() {
        let mut state = SessionState::new("s", "p", "/tmp/p");
        state.set_goal("fix the flaky retry test", vec!["fix".into(), "retry".into(), "test".into()], 1);
        let event = envelope("what's a good recipe for lasagna");
        let mut cooldowns = CooldownStore::load(&std::path::PathBuf::from("/tmp/no-such-d2.json"));
        let settings = HookSettings::default();
        let mut ctx = CheckContext { event: &event, state: &mut state, cooldowns: &mut cooldowns, settings: &settings, turn: 2, now: Utc::now() };
        let outcome = goal_anchor(&mut ctx);
        assert_eq!(outcome, CheckOutcome::allow());
    }

    #[test]
    fn test_rock_bottom_realignment_denies_at_ignorance_tier() {
        let mut state = SessionState::new("s", "p", "/tmp/p");
        state.confidence = 5;
        let event = envelope("keep going");
        let mut cooldowns = CooldownStore::load(&std::path::PathBuf::from("/tmp/no-such-e.json"));
        let settings = HookSettings::default();
        let mut ctx = CheckContext { event: &event, state: &mut state, cooldowns: &mut cooldowns, settings: &settings, turn: 3, now: Utc::now() };
        let outcome = rock_bottom_realignment(&mut ctx);
        assert!(matches!(outcome, CheckOutcome::Deny { .. }));
    }

    #[test]
    fn test_rock_bottom_realignment_allows_with_marker() {
        let mut state = SessionState::new("s", "p", "/tmp/p");
        state.confidence = 5;
        let event = envelope("realignment: original goal was X, tried Y, will change Z");
        let mut cooldowns = CooldownStore::load(&std::path::PathBuf::from("/tmp/no-such-e2.json"));
        let settings = HookSettings::default();
        let mut ctx = CheckContext { event: &event, state: &mut state, cooldowns: &mut cooldowns, settings: &settings, turn: 3, now: Utc::now() };
        let outcome = rock_bottom_realignment(&mut ctx);
        assert!(matches!(outcome, CheckOutcome::Allow { context: Some(_) }));
        assert_eq!(state.confidence, ROCK_BOTTOM_RECOVERY_TARGET);
    }
}
