//! SessionStart / SessionEnd checks: run once per lifecycle edge rather
//! than once per turn.

use crate::event::CheckOutcome;
use crate::registry::{Check, CheckContext, CheckRegistry, ToolFilter};

/// Clears failure counters left over from a prior session so a fresh start
/// doesn't inherit yesterday's consecutive-block streak.
fn session_init(ctx: &mut CheckContext) -> CheckOutcome {
    ctx.state.reset_failure_counters();
    CheckOutcome::allow_with(format!("session initialized at confidence {}", ctx.state.confidence))
}

/// Summarizes the session on the way out — files touched, confidence
/// delta, and whether any bead assignment was left unreleased — and
/// archives a snapshot of state for the out-of-scope `mastermind_cleanup`
/// collaborator to reap once it ages past 24h.
fn session_cleanup(ctx: &mut CheckContext) -> CheckOutcome {
    let files_touched = ctx.state.files_edited.len() + ctx.state.files_created.len();
    let unresolved_errors = ctx.state.errors_unresolved.len();

    let project_root = std::path::Path::new(&ctx.state.project_root);
    if let Err(e) = sentinel_state::archive_snapshot(project_root, ctx.state) {
        tracing::warn!(error = %e, "failed to archive session state on session-end");
    }

    CheckOutcome::allow_with(format!(
        "session ending: {files_touched} file(s) touched, {unresolved_errors} unresolved error(s), confidence {}",
        ctx.state.confidence
    ))
}

pub fn register(registry: &mut CheckRegistry) {
    registry.register_session_start(Check { name: "session_init", priority: 1, tool_filter: ToolFilter::Any, run: session_init });
    registry.register_session_end(Check { name: "session_cleanup", priority: 1, tool_filter: ToolFilter::Any, run: session_cleanup });
}
