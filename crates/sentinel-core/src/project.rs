//! Project root resolution.
//!
//! Mirrors the walk-up-for-markers strategy of the original Python
//! `project_context.find_project_root`: prefer an explicit override, then
//! walk parents looking for a `.beads/` directory or a `CLAUDE.md` file,
//! stopping at the user's home directory.

use std::path::{Path, PathBuf};

use directories::UserDirs;

use crate::error::SentinelError;

const PROJECT_ROOT_ENV: &str = "CLAUDE_PROJECT_ROOT";
const BEADS_DIR: &str = ".beads";
const MARKER_FILE: &str = "CLAUDE.md";
const ASSIGNMENTS_FILE: &str = "agent_assignments.jsonl";
const LIFECYCLE_LOG: &str = "lifecycle.log";

fn home_dir() -> Option<PathBuf> {
    UserDirs::new().map(|d| d.home_dir().to_path_buf())
}

/// Walks up from `start` looking for a project root.
///
/// Returns the first ancestor (inclusive of `start`) that contains a
/// `.beads/` directory or a `CLAUDE.md` file. `CLAUDE_PROJECT_ROOT`
/// overrides the search entirely when set. `~/.claude` is treated as its
/// own project root regardless of markers, since it holds the assistant's
/// own configuration rather than a user's code.
pub fn find_project_root(start: &Path) -> Result<PathBuf, SentinelError> {
    if let Ok(override_path) = std::env::var(PROJECT_ROOT_ENV) {
        if !override_path.is_empty() {
            return Ok(PathBuf::from(override_path));
        }
    }

    let home = home_dir();
    if let Some(home) = &home {
        let claude_dir = home.join(".claude");
        if start.starts_with(&claude_dir) {
            return Ok(claude_dir);
        }
    }

    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(BEADS_DIR).is_dir() || dir.join(MARKER_FILE).is_file() {
            return Ok(dir.to_path_buf());
        }
        if let Some(home) = &home {
            if dir == home.as_path() {
                break;
            }
        }
        current = dir.parent();
    }

    Err(SentinelError::ProjectRootNotFound(
        start.display().to_string(),
    ))
}

/// Returns true if `path` resolves to a project root at all.
pub fn is_in_project(path: &Path) -> bool {
    find_project_root(path).is_ok()
}

/// Last path component of the project root, used for display and logging.
pub fn get_project_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}

/// Returns `<root>/.beads`, creating it (and its `issues/` subdirectory)
/// when `create` is true and it does not already exist.
pub fn get_beads_dir(root: &Path, create: bool) -> std::io::Result<PathBuf> {
    let beads = root.join(BEADS_DIR);
    if create {
        std::fs::create_dir_all(beads.join("issues"))?;
    }
    Ok(beads)
}

/// Path to the append-only bead assignment ledger.
pub fn get_assignments_file(root: &Path) -> PathBuf {
    root.join(BEADS_DIR).join(ASSIGNMENTS_FILE)
}

/// Path to the session lifecycle log.
pub fn get_lifecycle_log(root: &Path) -> PathBuf {
    root.join(BEADS_DIR).join(LIFECYCLE_LOG)
}

/// Scans the conventional project parent directories (`~/projects/*`,
/// `~/ai/*`) plus `~/.claude` for directories that look like project
/// roots, for use by diagnostics/inventory subcommands.
pub fn get_all_project_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    let Some(home) = home_dir() else {
        return roots;
    };

    let claude_dir = home.join(".claude");
    if claude_dir.is_dir() {
        roots.push(claude_dir);
    }

    for parent_name in ["projects", "ai"] {
        let parent = home.join(parent_name);
        let Ok(entries) = std::fs::read_dir(&parent) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if path.join(BEADS_DIR).is_dir() || path.join(MARKER_FILE).is_file() {
                roots.push(path);
            }
        }
    }

    roots
}
