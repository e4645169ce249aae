//! Stop checks: non-gating, but `Block` here forces the assistant to keep
//! working instead of ending its turn.

use std::path::Path;
use std::time::Duration;

use sentinel_core::patterns;
use tokio::process::Command;

use crate::event::CheckOutcome;
use crate::registry::{Check, CheckContext, CheckRegistry, ToolFilter};

const GIT_COMMIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Scans files created this session for unfinished-looking byte patterns —
/// `TODO`, `FIXME`, a bare `pass` stub, `raise NotImplementedError` — and
/// blocks the stop so they get a second look instead of shipping silently.
fn stub_detector(ctx: &mut CheckContext) -> CheckOutcome {
    let project_root = Path::new(&ctx.state.project_root);
    for relative in &ctx.state.files_created {
        let path = project_root.join(relative);
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        if patterns::is_stub_content(&content) {
            return CheckOutcome::block(format!(
                "{relative} still looks unfinished (TODO/FIXME/stub marker found); finish it before stopping"
            ));
        }
    }
    CheckOutcome::allow()
}

/// Auto-commits pending edits on session stop, matching the executor's own
/// bounded, non-fatal subprocess idiom, run alongside the bead client as a
/// tokio-backed call.
fn auto_commit(ctx: &mut CheckContext) -> CheckOutcome {
    if ctx.state.files_edited.is_empty() && ctx.state.files_created.is_empty() {
        return CheckOutcome::allow();
    }

    let project_root = ctx.state.project_root.clone();
    let result = tokio::task::block_in_place(|| {
        tokio::runtime::Handle::current().block_on(async move { run_auto_commit(&project_root).await })
    });

    match result {
        Ok(true) => CheckOutcome::allow_with("auto-committed pending edits on stop"),
        Ok(false) => CheckOutcome::allow(),
        Err(err) => {
            tracing::warn!(error = %err, "auto-commit failed; leaving changes uncommitted");
            CheckOutcome::allow_with("auto-commit failed; changes remain uncommitted")
        }
    }
}

async fn run_auto_commit(project_root: &str) -> std::io::Result<bool> {
    let status_output = tokio::time::timeout(
        GIT_COMMIT_TIMEOUT,
        Command::new("git").arg("-C").arg(project_root).args(["status", "--porcelain"]).output(),
    )
    .await
    .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "git status timed out"))??;

    if status_output.stdout.is_empty() {
        return Ok(false);
    }

    tokio::time::timeout(
        GIT_COMMIT_TIMEOUT,
        Command::new("git").arg("-C").arg(project_root).args(["add", "-A"]).output(),
    )
    .await
    .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "git add timed out"))??;

    let commit_output = tokio::time::timeout(
        GIT_COMMIT_TIMEOUT,
        Command::new("git")
            .arg("-C")
            .arg(project_root)
            .args(["commit", "-m", "auto-commit: session checkpoint"])
            .output(),
    )
    .await
    .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "git commit timed out"))??;

    Ok(commit_output.status.success())
}

pub fn register(registry: &mut CheckRegistry) {
    registry.register_stop(Check { name: "stub_detector", priority: 50, tool_filter: ToolFilter::Any, run: stub_detector });
    registry.register_stop(Check { name: "auto_commit", priority: 10, tool_filter: ToolFilter::Any, run: auto_commit });
}
