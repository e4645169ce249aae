//! `sentinel ops` subcommands: maintenance and introspection outside the
//! hook event pipeline, grounded on `doctor`/`gc`-style maintenance
//! commands.

use std::path::Path;

use anyhow::{Context, Result};
use sentinel_core::Tier;

use crate::cli::OpsCommands;

pub fn run(cmd: OpsCommands) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let project_root = sentinel_core::project::find_project_root(&cwd).context("could not locate project root")?;

    match cmd {
        OpsCommands::Verify => verify(&project_root),
        OpsCommands::Fp { reducer } => dispute(&project_root, &reducer),
        OpsCommands::CapabilityInventory => capability_inventory(),
        OpsCommands::Cleanup { dry_run, max_age_hours } => cleanup(&project_root, dry_run, max_age_hours),
        OpsCommands::StateMigrate => state_migrate(&project_root),
    }
}

/// `CLAUDE_SESSION_ID` propagates into ops commands the same way it
/// propagates into bead assignments made from a hook invocation.
fn session_id(fallback: &str) -> String {
    std::env::var("CLAUDE_SESSION_ID").unwrap_or_else(|_| fallback.to_string())
}

fn verify(project_root: &Path) -> Result<()> {
    let state = sentinel_state::load(project_root, &session_id("ops-verify"), &project_root.to_string_lossy())?;
    let mut problems = Vec::new();

    if !(0..=100).contains(&state.confidence) {
        problems.push(format!("confidence {} is out of the [0, 100] bound", state.confidence));
    }
    if state.original_goal.is_some() != state.goal_set_turn.is_some() {
        problems.push("original_goal and goal_set_turn disagree on whether a goal is anchored".to_string());
    }
    let unresolved_count = state.errors_unresolved.len();
    let recent_unresolved = state.errors_recent.iter().filter(|e| !e.resolved).count();
    if unresolved_count != recent_unresolved {
        problems.push(format!(
            "errors_unresolved has {unresolved_count} entries but errors_recent shows {recent_unresolved} unresolved; the two ledgers have drifted"
        ));
    }

    if problems.is_empty() {
        println!("state OK: tier={}, confidence={}", Tier::from_confidence(state.confidence), state.confidence);
        Ok(())
    } else {
        for problem in &problems {
            eprintln!("INVARIANT VIOLATION: {problem}");
        }
        anyhow::bail!("{} invariant violation(s) found", problems.len());
    }
}

fn dispute(project_root: &Path, reducer_name: &str) -> Result<()> {
    let mut state = sentinel_state::load(project_root, &session_id("ops-fp"), &project_root.to_string_lossy())?;
    let turn = state.turn_count;
    match sentinel_confidence::dispute::apply(&mut state, reducer_name, turn) {
        Some(restored) => {
            let mut cooldowns = sentinel_lock::cooldown::CooldownStore::load(&sentinel_state::cooldowns_file_path(project_root));
            let fp_count = state.reducer_fp_counts.get(reducer_name).copied().unwrap_or(0);
            cooldowns.stretch(reducer_name, sentinel_confidence::dispute::cooldown_stretch(fp_count));
            cooldowns.save()?;
            sentinel_state::save(project_root, &mut state)?;
            println!("dispute accepted for {reducer_name}: confidence restored by {restored}");
            Ok(())
        }
        None => anyhow::bail!("{reducer_name} is not eligible for a dispute right now"),
    }
}

fn capability_inventory() -> Result<()> {
    let registry = sentinel_checks::bootstrap();
    for kind in [
        sentinel_core::EventKind::PreToolUse,
        sentinel_core::EventKind::PostToolUse,
        sentinel_core::EventKind::UserPromptSubmit,
        sentinel_core::EventKind::Stop,
        sentinel_core::EventKind::SubagentStop,
        sentinel_core::EventKind::SessionStart,
        sentinel_core::EventKind::SessionEnd,
        sentinel_core::EventKind::Notification,
    ] {
        let checks = registry.for_event(kind);
        if checks.is_empty() {
            continue;
        }
        println!("{kind}:");
        for check in checks {
            println!("  [{:>3}] {}", check.priority, check.name);
        }
    }
    Ok(())
}

fn cleanup(project_root: &Path, dry_run: bool, max_age_hours: i64) -> Result<()> {
    let locks_dir = sentinel_state::state_dir(project_root).join("locks");
    let mut removed_locks = 0u32;
    if let Ok(entries) = std::fs::read_dir(&locks_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("lock") {
                if dry_run {
                    removed_locks += 1;
                } else if std::fs::remove_file(&path).is_ok() {
                    removed_locks += 1;
                }
            }
        }
    }
    let removed_archives = sentinel_state::reap_stale_archives(project_root, max_age_hours, dry_run)?;

    let verb = if dry_run { "would remove" } else { "removed" };
    println!("{verb} {removed_locks} stale lock file(s) and {removed_archives} archived snapshot(s) older than {max_age_hours}h");
    Ok(())
}

fn state_migrate(project_root: &Path) -> Result<()> {
    let path = sentinel_state::state_file_path(project_root);
    let contents = std::fs::read_to_string(&path).context("no state file to migrate")?;
    let value: serde_json::Value = serde_json::from_str(&contents)?;
    let migrated = sentinel_state::migrate::upgrade(value);
    std::fs::write(&path, serde_json::to_string_pretty(&migrated)?)?;
    println!("state file migrated to schema version {}", sentinel_state::CURRENT_SCHEMA_VERSION);
    Ok(())
}
