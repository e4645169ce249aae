//! The composite runner's hook-event path: read one event off stdin,
//! dispatch it through the check registry, fold the confidence engine
//! over it, persist state, and print a decision. Every error is
//! swallowed into a neutral decision — the runner never lets a failure
//! here escalate to the host.

use std::io::Read;
use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use sentinel_checks::{CheckContext, CheckOutcome, Decision, EventEnvelope};
use sentinel_confidence::TurnContext;
use sentinel_core::EventKind;
use sentinel_lock::cooldown::CooldownStore;
use sentinel_lock::{acquire_lock, SessionLock};
use sentinel_state::SessionState;

const LOCK_RETRY_BUDGET: Duration = Duration::from_secs(2);
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(50);

pub fn run() -> Decision {
    let mut input = String::new();
    if std::io::stdin().read_to_string(&mut input).is_err() {
        return Decision::empty();
    }
    let Ok(event) = serde_json::from_str::<EventEnvelope>(&input) else {
        tracing::warn!("failed to parse hook event JSON");
        return Decision::empty();
    };
    let Some(kind) = event.kind() else {
        tracing::warn!(hook_event_name = %event.hook_event_name, "unrecognized event kind");
        return Decision::empty();
    };

    dispatch(kind, &event).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "runner pipeline failed; returning neutral decision");
        Decision::empty()
    })
}

fn dispatch(kind: EventKind, event: &EventEnvelope) -> anyhow::Result<Decision> {
    let cwd = std::env::current_dir()?;
    let project_root = sentinel_core::project::find_project_root(&cwd)?;

    // Bounded-retry lock acquisition: fall back to a degraded,
    // non-persisting pass if the lock can't be had within budget.
    let session_dir = sentinel_state::manager::state_dir(&project_root);
    let lock = try_acquire_with_retry(&session_dir, kind.as_str(), "state");

    let mut state = sentinel_state::manager::load(&project_root, &event.session_id, &project_root.to_string_lossy())?;
    let mut cooldowns = CooldownStore::load(&sentinel_state::manager::cooldowns_file_path(&project_root));
    let settings_cache = sentinel_checks::SettingsCache::new(&project_root);
    let settings = settings_cache.get();
    let registry = sentinel_checks::bootstrap();

    if kind.is_gating() {
        state.turn_count += 1;
    }
    let turn = state.turn_count;
    let now = Utc::now();

    let outcomes = {
        let mut ctx = CheckContext { event, state: &mut state, cooldowns: &mut cooldowns, settings: &settings, turn, now };
        registry.dispatch(kind, &mut ctx)
    };

    let turn_ctx = build_turn_context(event, &outcomes);
    let engine_outcome = sentinel_confidence::apply_turn(&mut state, &mut cooldowns, &turn_ctx, turn, now);
    state.clamp_confidence();
    tracing::debug!(
        old = engine_outcome.old_confidence,
        new = engine_outcome.new_confidence,
        fired_reducers = ?engine_outcome.fired_reducers,
        "confidence pipeline applied"
    );

    if lock.is_some() {
        sentinel_state::manager::save(&project_root, &mut state)?;
        cooldowns.save()?;
    } else {
        tracing::warn!("proceeding without the session lock; state changes this turn are not persisted");
    }

    Ok(fold_decision(kind, outcomes))
}

fn try_acquire_with_retry(session_dir: &Path, reason: &str, lock_name: &str) -> Option<SessionLock> {
    let deadline = Instant::now() + LOCK_RETRY_BUDGET;
    loop {
        match acquire_lock(session_dir, lock_name, reason) {
            Ok(lock) => return Some(lock),
            Err(_) if Instant::now() < deadline => std::thread::sleep(LOCK_RETRY_INTERVAL),
            Err(_) => return None,
        }
    }
}

fn build_turn_context(event: &EventEnvelope, outcomes: &[(&'static str, CheckOutcome)]) -> TurnContext {
    let mut ctx = TurnContext::new();
    ctx.tool_name = event.tool_name.clone();
    ctx.tool_succeeded = Some(event.tool_error.is_none());
    ctx.prompt_text = event.prompt.clone();
    ctx.edited_path = event.file_path().map(String::from);
    ctx.is_file_read = event.tool_name.as_deref() == Some("Read");
    ctx.is_search_tool = matches!(event.tool_name.as_deref(), Some("Grep") | Some("Glob"));
    ctx.is_bead_create = event.bash_command().map(|c| c.contains("bd create")).unwrap_or(false);
    if let Some(command) = event.bash_command() {
        ctx.is_test_command = command.contains("test");
        ctx.is_build_command = command.contains("build") || command.contains("cargo check");
        ctx.is_lint_command = command.contains("clippy") || command.contains("lint");
        ctx.is_productive_bash = ctx.is_test_command || ctx.is_build_command || ctx.is_lint_command;
        ctx.is_git_exploration = command.starts_with("git log") || command.starts_with("git show") || command.starts_with("git diff");
    }
    ctx.dispute_target = event.prompt.as_deref().and_then(sentinel_confidence::dispute::parse);
    ctx.hook_blocked_check = outcomes
        .iter()
        .find(|(_, outcome)| matches!(outcome, CheckOutcome::Deny { .. }))
        .map(|(name, _)| name.to_string());
    ctx
}

fn fold_decision(kind: EventKind, outcomes: Vec<(&'static str, CheckOutcome)>) -> Decision {
    let contexts: Vec<String> = outcomes
        .iter()
        .filter_map(|(_, outcome)| match outcome {
            CheckOutcome::Allow { context: Some(c) } => Some(c.clone()),
            _ => None,
        })
        .collect();
    let joined_context = if contexts.is_empty() { None } else { Some(contexts.join("; ")) };

    let first_deny = outcomes.iter().find_map(|(_, outcome)| match outcome {
        CheckOutcome::Deny { reason } => Some(reason.clone()),
        _ => None,
    });
    let first_block = outcomes.iter().find_map(|(_, outcome)| match outcome {
        CheckOutcome::Block { reason } => Some(reason.clone()),
        _ => None,
    });

    match kind {
        EventKind::PreToolUse | EventKind::UserPromptSubmit => match first_deny {
            Some(reason) => Decision::deny(reason, joined_context),
            None => Decision::approve_with_context(joined_context),
        },
        EventKind::Stop | EventKind::SubagentStop => match first_block {
            Some(reason) => Decision::block(reason),
            None => joined_context.map(Decision::stop_warning).unwrap_or_else(Decision::empty),
        },
        EventKind::PostToolUse | EventKind::SessionStart | EventKind::SessionEnd | EventKind::Notification => {
            Decision::context_only(joined_context)
        }
    }
}
