//! Runner-wide hook settings: a single JSON file under
//! `<framework_root>/config/hook_settings.json`, cached and invalidated by
//! mtime to avoid re-reading the file on every dispatch.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookSettings {
    #[serde(default)]
    pub cooldown: HashMap<String, u64>,
    #[serde(default)]
    pub threshold: HashMap<String, f64>,
    #[serde(default)]
    pub magic_number: HashMap<String, f64>,
    /// 0-4: gates which checks are live while a new check earns trust.
    #[serde(default)]
    pub rollout_phase: u8,
}

impl HookSettings {
    pub fn cooldown_secs(&self, name: &str, default: u64) -> u64 {
        self.cooldown.get(name).copied().unwrap_or(default)
    }

    pub fn threshold(&self, name: &str, default: f64) -> f64 {
        self.threshold.get(name).copied().unwrap_or(default)
    }

    pub fn magic_number(&self, name: &str, default: f64) -> f64 {
        self.magic_number.get(name).copied().unwrap_or(default)
    }
}

struct Cached {
    mtime: Option<SystemTime>,
    settings: HookSettings,
}

/// Loads and caches `HookSettings` keyed by path, reloading only when the
/// file's mtime has moved since the last read.
pub struct SettingsCache {
    path: PathBuf,
    cached: Mutex<Option<Cached>>,
}

impl SettingsCache {
    pub fn new(framework_root: &Path) -> Self {
        SettingsCache {
            path: framework_root.join("config").join("hook_settings.json"),
            cached: Mutex::new(None),
        }
    }

    pub fn get(&self) -> HookSettings {
        let mtime = fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        let mut guard = self.cached.lock().unwrap();

        let needs_reload = match guard.as_ref() {
            Some(cached) => cached.mtime != mtime,
            None => true,
        };

        if needs_reload {
            let settings = fs::read_to_string(&self.path)
                .ok()
                .and_then(|contents| serde_json::from_str(&contents).ok())
                .unwrap_or_default();
            *guard = Some(Cached { mtime, settings });
        }

        guard.as_ref().unwrap().settings.clone()
    }
}

/// Reads `CLAUDE_HOOK_DISABLE_<NAME>` or `CHECK_DISABLE_<NAME>`, checked at
/// dispatch time rather than at registration so toggling it mid-session
/// takes effect on the very next event.
pub fn is_disabled(check_name: &str) -> bool {
    let upper = check_name.to_uppercase();
    for prefix in ["CLAUDE_HOOK_DISABLE_", "CHECK_DISABLE_"] {
        if let Ok(value) = std::env::var(format!("{prefix}{upper}")) {
            if value == "1" || value.eq_ignore_ascii_case("true") {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let cache = SettingsCache::new(dir.path());
        let settings = cache.get();
        assert_eq!(settings.rollout_phase, 0);
        assert_eq!(settings.threshold("gap_detector", 0.5), 0.5);
    }

    #[test]
    fn test_reloads_after_mtime_change() {
        let dir = tempdir().unwrap();
        let config_dir = dir.path().join("config");
        fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join("hook_settings.json");

        fs::write(&path, r#"{"rollout_phase": 1}"#).unwrap();
        let cache = SettingsCache::new(dir.path());
        assert_eq!(cache.get().rollout_phase, 1);

        std::thread::sleep(std::time::Duration::from_millis(10));
        let mut f = fs::OpenOptions::new().write(true).truncate(true).open(&path).unwrap();
        write!(f, r#"{{"rollout_phase": 3}}"#).unwrap();
        drop(f);

        assert_eq!(cache.get().rollout_phase, 3);
    }

    #[test]
    fn test_is_disabled_reads_check_disable_env() {
        std::env::set_var("CHECK_DISABLE_TEST_EXAMPLE", "1");
        assert!(is_disabled("test_example"));
        std::env::remove_var("CHECK_DISABLE_TEST_EXAMPLE");
        assert!(!is_disabled("test_example"));
    }
}
