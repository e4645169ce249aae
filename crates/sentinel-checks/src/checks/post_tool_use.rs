//! PostToolUse checks: never gating — every outcome folds into
//! `context`, never `decision`.

use sentinel_core::patterns;

use crate::event::CheckOutcome;
use crate::registry::{Check, CheckContext, CheckRegistry, ToolFilter};

/// Records failures/successes into the session ledger, maintains the
/// consecutive-failure streak `oracle_gate` reads, and flags command output
/// that still contains an unresolved-looking error keyword after the tool
/// reported success — a sign the tool's exit code lied.
fn outcome_recorder(ctx: &mut CheckContext) -> CheckOutcome {
    let succeeded = ctx.event.tool_error.is_none();
    if ctx.event.is_bash_tool() {
        if let Some(command) = ctx.event.bash_command() {
            ctx.state.record_command(command, succeeded, ctx.turn);
        }
    }
    if succeeded {
        ctx.state.consecutive_failures = 0;
    } else {
        ctx.state.consecutive_failures += 1;
    }

    let output = ctx.event.tool_output_text();
    if succeeded && patterns::contains_error_keyword(&output) {
        ctx.state.record_error("latent_failure", &output, ctx.turn);
        return CheckOutcome::allow_with(
            "tool reported success but its output still contains an error-shaped message; verify before trusting it",
        );
    }
    if !succeeded {
        ctx.state.record_error("tool_error", &ctx.event.tool_error.clone().unwrap_or_default(), ctx.turn);
    }
    CheckOutcome::allow()
}

/// Flags a file that has been edited the same way repeatedly without a
/// fresh read in between — the edit/revert churn pattern the sunk-cost
/// reducer also watches for.
fn stuck_loop_detector(ctx: &mut CheckContext) -> CheckOutcome {
    if !ctx.event.is_write_tool() {
        return CheckOutcome::allow();
    }
    let Some(path) = ctx.event.file_path() else {
        return CheckOutcome::allow();
    };
    let hash = ctx.event.new_content().map(|c| format!("{:x}", md5_like_hash(c)));
    ctx.state.record_file_edit(path, ctx.turn, hash.clone());

    let edit_count = ctx.state.edit_counts.get(path).copied().unwrap_or(0);
    if edit_count >= 4 {
        CheckOutcome::allow_with(format!(
            "{path} has been edited {edit_count} times this session; consider re-reading it before the next change"
        ))
    } else {
        CheckOutcome::allow()
    }
}

/// A cheap, dependency-free content fingerprint — not cryptographic, only
/// used to spot "edited back to the same text" oscillation.
fn md5_like_hash(content: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

pub fn register(registry: &mut CheckRegistry) {
    registry.register_post_tool_use(Check { name: "outcome_recorder", priority: 50, tool_filter: ToolFilter::Any, run: outcome_recorder });
    registry.register_post_tool_use(Check { name: "stuck_loop_detector", priority: 20, tool_filter: ToolFilter::Any, run: stuck_loop_detector });
}
