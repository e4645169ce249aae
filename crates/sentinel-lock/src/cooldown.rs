//! Keyed TTL cooldown store.
//!
//! Reducers and checks that fire repeatedly on the same trigger (e.g. a
//! confidence reducer tripped by the same tool-debt family) are put on
//! cooldown so they can't refire until the TTL elapses. The store is a
//! single JSON file per project, written atomically (temp file + rename)
//! the same way the state store persists session state.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownEntry {
    pub until: DateTime<Utc>,
    /// Multiplies future cooldown durations for this key after a dispute is
    /// upheld against it, so a reducer confirmed to be a false positive
    /// backs off more aggressively next time it fires.
    pub fp_stretch_multiplier: f64,
}

impl Default for CooldownEntry {
    fn default() -> Self {
        CooldownEntry {
            until: Utc::now(),
            fp_stretch_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CooldownFile {
    entries: HashMap<String, CooldownEntry>,
}

pub struct CooldownStore {
    path: PathBuf,
    file: CooldownFile,
}

impl CooldownStore {
    /// Loads the store from `path`, starting empty if the file doesn't exist
    /// yet or fails to parse.
    pub fn load(path: &Path) -> Self {
        let file = fs::read_to_string(path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default();
        CooldownStore {
            path: path.to_path_buf(),
            file,
        }
    }

    /// Atomically persists the store: write to a sibling temp file, then
    /// rename over the target so a crash mid-write never leaves a partial
    /// file in place.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.file)
            .context("failed to serialize cooldown store")?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed to rename into {}", self.path.display()))?;
        Ok(())
    }

    /// Returns true if `key` is currently on cooldown relative to `now`.
    pub fn is_on_cooldown(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.file
            .entries
            .get(key)
            .map(|entry| entry.until > now)
            .unwrap_or(false)
    }

    /// Puts `key` on cooldown for `duration` past `now`, scaled by any
    /// accumulated false-positive stretch multiplier.
    pub fn set_cooldown(&mut self, key: &str, duration: Duration, now: DateTime<Utc>) {
        let multiplier = self
            .file
            .entries
            .get(key)
            .map(|e| e.fp_stretch_multiplier)
            .unwrap_or(1.0);
        let scaled = duration.mul_f64(multiplier);
        let until = now
            + chrono::Duration::from_std(scaled).unwrap_or_else(|_| chrono::Duration::zero());
        self.file
            .entries
            .entry(key.to_string())
            .and_modify(|e| e.until = until)
            .or_insert(CooldownEntry {
                until,
                fp_stretch_multiplier: multiplier,
            });
    }

    /// Clears any active cooldown for `key` without touching its stretch
    /// multiplier.
    pub fn reset_cooldown(&mut self, key: &str) {
        if let Some(entry) = self.file.entries.get_mut(key) {
            entry.until = Utc::now() - chrono::Duration::seconds(1);
        }
    }

    /// Multiplies `key`'s stretch factor, applied on the next `set_cooldown`
    /// call. Used when a dispute against a reducer is upheld.
    pub fn stretch(&mut self, key: &str, factor: f64) {
        let entry = self.file.entries.entry(key.to_string()).or_default();
        entry.fp_stretch_multiplier *= factor;
    }
}
