//! Atomic load/save of `SessionState`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sentinel_core::SentinelError;

use crate::migrate;
use crate::state::SessionState;

const STATE_DIR: &str = ".claude/state";
const STATE_FILE_NAME: &str = "session_state.json";
const COOLDOWNS_FILE_NAME: &str = "cooldowns.json";
const LOCK_FILE_NAME: &str = "session_state.lock";
const ARCHIVE_DIR: &str = ".claude/tmp";
const ARCHIVE_PREFIX: &str = "mastermind_";

pub fn state_dir(project_root: &Path) -> PathBuf {
    project_root.join(STATE_DIR)
}

pub fn state_file_path(project_root: &Path) -> PathBuf {
    state_dir(project_root).join(STATE_FILE_NAME)
}

pub fn cooldowns_file_path(project_root: &Path) -> PathBuf {
    state_dir(project_root).join(COOLDOWNS_FILE_NAME)
}

pub fn lock_file_path(project_root: &Path) -> PathBuf {
    state_dir(project_root).join(LOCK_FILE_NAME)
}

pub fn archive_dir(project_root: &Path) -> PathBuf {
    project_root.join(ARCHIVE_DIR)
}

/// Snapshots `state` to `.claude/tmp/mastermind_<unix_ts>.json`, called
/// from `session_cleanup` on `SessionEnd`. The `mastermind_cleanup` ops
/// command later reaps these once they age out.
pub fn archive_snapshot(project_root: &Path, state: &SessionState) -> Result<PathBuf> {
    let dir = archive_dir(project_root);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let ts = chrono::Utc::now().timestamp();
    let path = dir.join(format!("{ARCHIVE_PREFIX}{ts}.json"));
    let json = serde_json::to_string_pretty(state)
        .map_err(|e| SentinelError::StateCorrupt(e.to_string()))
        .context("failed to serialize session state for archive")?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Removes archived snapshots older than `max_age_hours`; with `dry_run`,
/// counts what would be removed without touching the filesystem.
pub fn reap_stale_archives(project_root: &Path, max_age_hours: i64, dry_run: bool) -> Result<u32> {
    let dir = archive_dir(project_root);
    let Ok(entries) = fs::read_dir(&dir) else {
        return Ok(0);
    };
    let cutoff = chrono::Utc::now() - chrono::Duration::hours(max_age_hours);
    let mut removed = 0u32;
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(ts_str) = name.strip_prefix(ARCHIVE_PREFIX).and_then(|s| s.strip_suffix(".json")) else {
            continue;
        };
        let Ok(ts) = ts_str.parse::<i64>() else {
            continue;
        };
        let Some(created) = chrono::DateTime::from_timestamp(ts, 0) else {
            continue;
        };
        if created < cutoff {
            removed += 1;
            if !dry_run {
                let _ = fs::remove_file(&path);
            }
        }
    }
    Ok(removed)
}

/// Loads session state for `project_root`, returning a fresh zero-state if
/// the file is missing. On a corrupt file, the bad file is renamed aside
/// with a `.corrupt` suffix and a zero-state is returned rather than
/// propagating the error — state errors should never deny the host.
pub fn load(project_root: &Path, session_id: &str, project_id: &str) -> Result<SessionState> {
    let path = state_file_path(project_root);
    if !path.exists() {
        return Ok(SessionState::new(
            session_id,
            project_id,
            project_root.to_string_lossy(),
        ));
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    match serde_json::from_str::<serde_json::Value>(&contents) {
        Ok(raw) => {
            let migrated = migrate::upgrade(raw);
            match serde_json::from_value::<SessionState>(migrated) {
                Ok(state) => Ok(state),
                Err(e) => Ok(recover_corrupt(
                    &path,
                    project_root,
                    session_id,
                    project_id,
                    &e.to_string(),
                )),
            }
        }
        Err(e) => Ok(recover_corrupt(
            &path,
            project_root,
            session_id,
            project_id,
            &e.to_string(),
        )),
    }
}

fn recover_corrupt(
    path: &Path,
    project_root: &Path,
    session_id: &str,
    project_id: &str,
    reason: &str,
) -> SessionState {
    let backup = path.with_extension("json.corrupt");
    if let Err(rename_err) = fs::rename(path, &backup) {
        tracing::warn!(error = %rename_err, "failed to back up corrupt state file");
    } else {
        tracing::warn!(
            reason,
            backup = %backup.display(),
            "recovered corrupt session state -> zero-state"
        );
    }
    let mut state = SessionState::new(session_id, project_id, project_root.to_string_lossy());
    state.push_evidence("state_corrupt_recovery", reason, 0);
    state
}

/// Serializes `state` to a temp file in the state directory and renames it
/// over the target, so a crash mid-write can never leave a partial file.
pub fn save(project_root: &Path, state: &mut SessionState) -> Result<()> {
    state.clamp_confidence();
    state.updated_at = chrono::Utc::now();

    let dir = state_dir(project_root);
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let path = state_file_path(project_root);
    let json = serde_json::to_string_pretty(state)
        .map_err(|e| SentinelError::StateCorrupt(e.to_string()))
        .context("failed to serialize session state")?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json)
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, &path)
        .with_context(|| format!("failed to rename into {}", path.display()))?;

    Ok(())
}
