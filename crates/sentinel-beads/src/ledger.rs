//! Append-only bead assignment ledger.
//!
//! Grounded on `bead_claim.py`/`bead_release.py`: claiming appends a new
//! assignment record; releasing never mutates it in place but appends a
//! second record carrying the release outcome. Current state is derived by
//! folding all records for an `assignment_id`, keeping only the latest.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub assignment_id: String,
    pub bead_id: String,
    pub agent_session_id: String,
    pub parent_session_id: Option<String>,
    pub prompt_snippet: Option<String>,
    pub claimed_at: DateTime<Utc>,
    pub expected_deadline: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
    pub release_status: Option<ReleaseStatus>,
}

/// A record written to the JSONL file. Release records carry the same
/// `assignment_id` as the claim they close out but only set the release
/// fields; everything else is folded in from the original claim record.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerRecord {
    assignment_id: String,
    #[serde(default)]
    bead_id: Option<String>,
    #[serde(default)]
    agent_session_id: Option<String>,
    #[serde(default)]
    parent_session_id: Option<String>,
    #[serde(default)]
    prompt_snippet: Option<String>,
    #[serde(default)]
    claimed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    expected_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    released_at: Option<DateTime<Utc>>,
    #[serde(default)]
    release_status: Option<ReleaseStatus>,
}

pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Ledger { path: path.into() }
    }

    fn append(&self, record: &LedgerRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{line}")
    }

    fn read_records(&self) -> std::io::Result<Vec<LedgerRecord>> {
        let Ok(file) = std::fs::File::open(&self.path) else {
            return Ok(Vec::new());
        };
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(record) = serde_json::from_str::<LedgerRecord>(&line) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Folds the append-only log by `assignment_id`, merging each
    /// assignment's claim record with its release record (if any) so
    /// callers see one coherent view per assignment.
    pub fn fold(&self) -> std::io::Result<Vec<Assignment>> {
        let mut merged: HashMap<String, Assignment> = HashMap::new();
        let mut order: Vec<String> = Vec::new();

        for record in self.read_records()? {
            if let Some(existing) = merged.get_mut(&record.assignment_id) {
                if record.released_at.is_some() {
                    existing.released_at = record.released_at;
                    existing.release_status = record.release_status;
                }
                continue;
            }

            let Some(bead_id) = record.bead_id.clone() else {
                // A release-only record with no prior claim in this read is
                // a malformed ledger entry; skip rather than synthesize one.
                continue;
            };
            order.push(record.assignment_id.clone());
            merged.insert(
                record.assignment_id.clone(),
                Assignment {
                    assignment_id: record.assignment_id,
                    bead_id,
                    agent_session_id: record.agent_session_id.unwrap_or_default(),
                    parent_session_id: record.parent_session_id,
                    prompt_snippet: record.prompt_snippet,
                    claimed_at: record.claimed_at.unwrap_or_else(Utc::now),
                    expected_deadline: record.expected_deadline.unwrap_or_else(Utc::now),
                    released_at: record.released_at,
                    release_status: record.release_status,
                },
            );
        }

        Ok(order.into_iter().filter_map(|id| merged.remove(&id)).collect())
    }

    /// True if `bead_id` has an assignment with no release record yet,
    /// for any agent — the invariant guarding a new claim.
    pub fn has_unreleased(&self, bead_id: &str) -> std::io::Result<bool> {
        Ok(self
            .fold()?
            .iter()
            .any(|a| a.bead_id == bead_id && a.released_at.is_none()))
    }

    pub fn unreleased_for_agent(
        &self,
        bead_id: &str,
        agent_session_id: &str,
    ) -> std::io::Result<Option<Assignment>> {
        Ok(self
            .fold()?
            .into_iter()
            .find(|a| a.bead_id == bead_id && a.agent_session_id == agent_session_id && a.released_at.is_none()))
    }

    pub fn claim(&self, assignment: &Assignment) -> std::io::Result<()> {
        self.append(&LedgerRecord {
            assignment_id: assignment.assignment_id.clone(),
            bead_id: Some(assignment.bead_id.clone()),
            agent_session_id: Some(assignment.agent_session_id.clone()),
            parent_session_id: assignment.parent_session_id.clone(),
            prompt_snippet: assignment.prompt_snippet.clone(),
            claimed_at: Some(assignment.claimed_at),
            expected_deadline: Some(assignment.expected_deadline),
            released_at: None,
            release_status: None,
        })
    }

    pub fn release(
        &self,
        assignment_id: &str,
        released_at: DateTime<Utc>,
        status: ReleaseStatus,
    ) -> std::io::Result<()> {
        self.append(&LedgerRecord {
            assignment_id: assignment_id.to_string(),
            bead_id: None,
            agent_session_id: None,
            parent_session_id: None,
            prompt_snippet: None,
            claimed_at: None,
            expected_deadline: None,
            released_at: Some(released_at),
            release_status: Some(status),
        })
    }
}

pub fn default_path(project_root: &Path) -> PathBuf {
    sentinel_core::project::get_assignments_file(project_root)
}
