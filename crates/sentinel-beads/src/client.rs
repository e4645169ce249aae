//! Thin wrapper over the external task-tracker CLI.
//!
//! Grounded on `bd_client.py`'s `run_bd`: resolve the binary once, shell out
//! with a bounded timeout, parse `--json` output, and never let a failure
//! escalate — task tracking is advisory, not load-bearing. Subprocess calls
//! go through `tokio::process::Command` + `tokio::time::timeout`, matching
//! the executor's own bounded-subprocess idiom.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::process::Command;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Bead {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "issue_type")]
    pub issue_type: String,
    #[serde(default)]
    pub priority: Option<String>,
    /// Fields the tracker returns that this wrapper doesn't model explicitly.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum BeadClientError {
    #[error("bd binary not found on PATH")]
    BinaryNotFound,
    #[error("bd command timed out after {0:?}")]
    Timeout(Duration),
    #[error("bd exited with status {status}: {stderr}")]
    NonZeroExit { status: i32, stderr: String },
    #[error("failed to parse bd output as JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("failed to spawn bd: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Wraps the `bd` CLI with a per-invocation cache, matching the source's
/// "each hook runs as a fresh subprocess, so module-level caches are safe"
/// design ("per-process cache as implicit monad").
pub struct BeadClient {
    binary: String,
    timeout: Duration,
    cache: HashMap<String, Value>,
}

impl BeadClient {
    /// Resolves the `bd` binary on PATH. Returns `BinaryNotFound` rather
    /// than panicking — callers treat an absent tracker as "beads advisory
    /// features are unavailable this session", never a fatal condition.
    pub fn discover() -> Result<Self, BeadClientError> {
        let binary = which::which("bd")
            .map(|p| p.to_string_lossy().into_owned())
            .map_err(|_| BeadClientError::BinaryNotFound)?;
        Ok(Self::with_binary(binary))
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        BeadClient {
            binary: binary.into(),
            timeout: DEFAULT_TIMEOUT,
            cache: HashMap::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&mut self, args: &[&str]) -> Result<Value, BeadClientError> {
        let key = args.join(" ");
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }

        let mut full_args: Vec<&str> = args.to_vec();
        if !full_args.contains(&"--json") {
            full_args.push("--json");
        }

        let mut cmd = Command::new(&self.binary);
        cmd.args(&full_args);
        cmd.kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| BeadClientError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(BeadClientError::NonZeroExit {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let trimmed = stdout.trim();
        let value: Value = if trimmed.is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(trimmed)?
        };

        self.cache.insert(key, value.clone());
        Ok(value)
    }

    fn beads_from(value: Value) -> Vec<Bead> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect(),
            Value::Object(_) => serde_json::from_value(value).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    pub async fn list(&mut self, status: Option<&str>) -> Result<Vec<Bead>, BeadClientError> {
        let mut args = vec!["list"];
        if let Some(s) = status {
            args.push("--status");
            args.push(s);
        }
        self.run(&args).await.map(Self::beads_from)
    }

    pub async fn show(&mut self, id: &str) -> Result<Option<Bead>, BeadClientError> {
        let value = self.run(&["show", id]).await?;
        Ok(Self::beads_from(value).into_iter().next())
    }

    pub async fn ready(&mut self, limit: u32) -> Result<Vec<Bead>, BeadClientError> {
        let limit_str = limit.to_string();
        self.run(&["ready", "--limit", &limit_str]).await.map(Self::beads_from)
    }

    pub async fn blocked(&mut self) -> Result<Vec<Bead>, BeadClientError> {
        self.run(&["blocked"]).await.map(Self::beads_from)
    }

    pub async fn create(&mut self, title: &str, issue_type: &str, priority: &str) -> Result<Bead, BeadClientError> {
        let value = self.run(&["create", title, "--type", issue_type, "--priority", priority]).await?;
        Self::beads_from(value)
            .into_iter()
            .next()
            .ok_or_else(|| BeadClientError::InvalidJson(serde::de::Error::custom("create returned no bead")))
    }

    pub async fn update(&mut self, id: &str, status: &str) -> Result<(), BeadClientError> {
        let status_flag = format!("--status={status}");
        self.run(&["update", id, &status_flag]).await.map(|_| ())
    }

    pub async fn close(&mut self, id: &str) -> Result<(), BeadClientError> {
        self.run(&["close", id]).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beads_from_array() {
        let value = serde_json::json!([
            {"id": "bd-1", "title": "a", "status": "open", "issue_type": "task"},
            {"id": "bd-2", "title": "b", "status": "open", "issue_type": "bug"},
        ]);
        let beads = BeadClient::beads_from(value);
        assert_eq!(beads.len(), 2);
        assert_eq!(beads[0].id, "bd-1");
    }

    #[test]
    fn test_beads_from_single_object() {
        let value = serde_json::json!({"id": "bd-1", "title": "a", "status": "open", "issue_type": "task"});
        let beads = BeadClient::beads_from(value);
        assert_eq!(beads.len(), 1);
    }

    #[test]
    fn test_beads_from_empty_object_is_empty() {
        let value = serde_json::json!({});
        let beads = BeadClient::beads_from(value);
        assert!(beads.is_empty());
    }

    #[tokio::test]
    async fn test_missing_binary_is_non_fatal_error() {
        let mut client = BeadClient::with_binary("definitely-not-a-real-bd-binary");
        let err = client.list(None).await.unwrap_err();
        assert!(matches!(err, BeadClientError::Spawn(_)));
    }
}
