//! Session state types.
//!
//! `SessionState` is the single persisted entity per project: one JSON file
//! mutated only by the composite runner under the project's advisory lock.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use sentinel_core::Domain;
use serde::{Deserialize, Serialize};

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const MAX_LEDGER_LEN: usize = 500;
const MAX_EVIDENCE_LEN: usize = 200;
const MAX_ERROR_DETAIL_LEN: usize = 500;
const MAX_GOAL_LEN: usize = 200;
const MAX_GOAL_KEYWORDS: usize = 10;
const MAX_EVIDENCE_CONTENT_LEN: usize = 200;

pub const STARTING_CONFIDENCE: i32 = 70;

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn push_bounded<T>(ledger: &mut Vec<T>, item: T) {
    ledger.push(item);
    if ledger.len() > MAX_LEDGER_LEN {
        let overflow = ledger.len() - MAX_LEDGER_LEN;
        ledger.drain(0..overflow);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRecord {
    pub command: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub turn: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingIntegrationGrep {
    pub function_name: String,
    pub source_file: String,
    pub recorded_turn: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastDeploy {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

/// The central persisted entity, one per project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub schema_version: u32,

    // Identity
    pub session_id: String,
    pub project_id: String,
    pub project_root: String,
    pub turn_count: u64,

    // Activity ledgers
    #[serde(default)]
    pub files_read: Vec<String>,
    #[serde(default)]
    pub files_edited: Vec<String>,
    #[serde(default)]
    pub files_created: Vec<String>,
    #[serde(default)]
    pub edit_counts: HashMap<String, u64>,
    #[serde(default)]
    pub edit_history: HashMap<String, String>,
    #[serde(default)]
    pub commands_succeeded: Vec<CommandRecord>,
    #[serde(default)]
    pub commands_failed: Vec<CommandRecord>,
    #[serde(default)]
    pub libraries_used: HashSet<String>,
    #[serde(default)]
    pub libraries_researched: HashSet<String>,
    #[serde(default)]
    pub ops_turns: HashMap<String, u64>,

    // Error ledger
    #[serde(default)]
    pub errors_recent: Vec<ErrorEntry>,
    #[serde(default)]
    pub errors_unresolved: Vec<ErrorEntry>,

    // Confidence block
    #[serde(default = "default_confidence")]
    pub confidence: i32,
    #[serde(default)]
    pub evidence_ledger: VecDeque<EvidenceEntry>,
    #[serde(default)]
    pub reducer_triggers: HashMap<String, u32>,
    #[serde(default)]
    pub increaser_triggers: HashMap<String, u32>,
    #[serde(default)]
    pub nudge_history: HashMap<String, u64>,
    #[serde(default)]
    pub reducer_fp_counts: HashMap<String, u32>,
    #[serde(default)]
    pub tool_debt: HashMap<String, f64>,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub diminishing_counters: HashMap<String, u32>,

    // Goal anchor
    #[serde(default)]
    pub original_goal: Option<String>,
    #[serde(default)]
    pub goal_keywords: Vec<String>,
    #[serde(default)]
    pub goal_set_turn: Option<u64>,

    // Domain
    #[serde(default)]
    pub domain: Domain,
    #[serde(default)]
    pub domain_confidence: f64,

    // Work tracking
    #[serde(default)]
    pub pending_integration_greps: Vec<PendingIntegrationGrep>,
    #[serde(default)]
    pub pending_files: Vec<String>,
    #[serde(default)]
    pub pending_searches: Vec<String>,
    #[serde(default)]
    pub work_items: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,

    // Safety counters
    #[serde(default)]
    pub consecutive_blocks: HashMap<String, u32>,
    #[serde(default)]
    pub consecutive_failures: u32,
    #[serde(default)]
    pub last_deploy: Option<LastDeploy>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_confidence() -> i32 {
    STARTING_CONFIDENCE
}

impl SessionState {
    /// A fresh zero-state for a session, as returned by `load` when no state
    /// file exists yet.
    pub fn new(session_id: impl Into<String>, project_id: impl Into<String>, project_root: impl Into<String>) -> Self {
        let now = Utc::now();
        SessionState {
            schema_version: CURRENT_SCHEMA_VERSION,
            session_id: session_id.into(),
            project_id: project_id.into(),
            project_root: project_root.into(),
            turn_count: 0,
            files_read: Vec::new(),
            files_edited: Vec::new(),
            files_created: Vec::new(),
            edit_counts: HashMap::new(),
            edit_history: HashMap::new(),
            commands_succeeded: Vec::new(),
            commands_failed: Vec::new(),
            libraries_used: HashSet::new(),
            libraries_researched: HashSet::new(),
            ops_turns: HashMap::new(),
            errors_recent: Vec::new(),
            errors_unresolved: Vec::new(),
            confidence: STARTING_CONFIDENCE,
            evidence_ledger: VecDeque::new(),
            reducer_triggers: HashMap::new(),
            increaser_triggers: HashMap::new(),
            nudge_history: HashMap::new(),
            reducer_fp_counts: HashMap::new(),
            tool_debt: HashMap::new(),
            streak: 0,
            diminishing_counters: HashMap::new(),
            original_goal: None,
            goal_keywords: Vec::new(),
            goal_set_turn: None,
            domain: Domain::default(),
            domain_confidence: 0.0,
            pending_integration_greps: Vec::new(),
            pending_files: Vec::new(),
            pending_searches: Vec::new(),
            work_items: Vec::new(),
            features: Vec::new(),
            consecutive_blocks: HashMap::new(),
            consecutive_failures: 0,
            last_deploy: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Records that `path` was read this turn. Duplicates are allowed in
    /// storage; `has_read` dedups for query purposes, so calling this `n`
    /// times is idempotent from the caller's point of view.
    pub fn record_file_read(&mut self, path: &str, turn: u64) {
        push_bounded(&mut self.files_read, path.to_string());
        self.push_evidence("file_read", path, turn);
    }

    pub fn has_read(&self, path: &str) -> bool {
        self.files_read.iter().any(|p| p == path)
    }

    /// Records an edit to `path`. Unlike `record_file_read`, `edit_counts`
    /// increments every call — edits are not idempotent the way reads are.
    pub fn record_file_edit(&mut self, path: &str, turn: u64, content_hash: Option<String>) {
        push_bounded(&mut self.files_edited, path.to_string());
        *self.edit_counts.entry(path.to_string()).or_insert(0) += 1;
        if let Some(hash) = content_hash {
            self.edit_history.insert(path.to_string(), hash);
        }
        self.push_evidence("file_edit", path, turn);
    }

    pub fn record_file_created(&mut self, path: &str, turn: u64) {
        push_bounded(&mut self.files_created, path.to_string());
        self.push_evidence("file_created", path, turn);
    }

    pub fn record_command(&mut self, command: &str, succeeded: bool, _turn: u64) {
        let record = CommandRecord {
            command: command.to_string(),
            timestamp: Utc::now(),
        };
        if succeeded {
            push_bounded(&mut self.commands_succeeded, record);
        } else {
            push_bounded(&mut self.commands_failed, record);
        }
    }

    /// Adds an error to both ledgers. The invariant "an error is in
    /// `errors_unresolved` iff `resolved == false`" holds because this is
    /// the only insertion point and it always starts unresolved.
    pub fn record_error(&mut self, kind: &str, details: &str, _turn: u64) {
        let entry = ErrorEntry {
            kind: kind.to_string(),
            details: truncate(details, MAX_ERROR_DETAIL_LEN),
            timestamp: Utc::now(),
            resolved: false,
        };
        push_bounded(&mut self.errors_recent, entry.clone());
        self.errors_unresolved.push(entry);
    }

    /// Marks all unresolved errors whose `details` contains `pattern` as
    /// resolved. Idempotent: once no unresolved error matches, subsequent
    /// calls are no-ops.
    pub fn resolve_error(&mut self, pattern: &str) {
        self.errors_unresolved.retain(|e| !e.details.contains(pattern));
        for entry in self.errors_recent.iter_mut() {
            if entry.details.contains(pattern) {
                entry.resolved = true;
            }
        }
    }

    /// Sets the goal anchor if not already set. `original_goal` is frozen
    /// once assigned and only clears on `reset_goal`.
    pub fn set_goal(&mut self, prompt: &str, keywords: Vec<String>, turn: u64) {
        if self.original_goal.is_some() {
            return;
        }
        self.original_goal = Some(truncate(prompt, MAX_GOAL_LEN));
        self.goal_keywords = keywords.into_iter().take(MAX_GOAL_KEYWORDS).collect();
        self.goal_set_turn = Some(turn);
    }

    pub fn reset_goal(&mut self) {
        self.original_goal = None;
        self.goal_keywords.clear();
        self.goal_set_turn = None;
    }

    /// Appends an evidence record, truncating `content` and evicting the
    /// oldest entry once the ring exceeds its bound.
    pub fn push_evidence(&mut self, kind: &str, content: &str, turn: u64) {
        self.evidence_ledger.push_back(EvidenceEntry {
            kind: kind.to_string(),
            content: truncate(content, MAX_EVIDENCE_CONTENT_LEN),
            turn,
            timestamp: Utc::now(),
        });
        while self.evidence_ledger.len() > MAX_EVIDENCE_LEN {
            self.evidence_ledger.pop_front();
        }
    }

    /// Clamps confidence into `[0, 100]`. The confidence engine computes the
    /// delta and rate-limiting; this is the final bounds enforcement that
    /// must hold after every `save`.
    pub fn clamp_confidence(&mut self) {
        self.confidence = self.confidence.clamp(0, 100);
    }

    /// Resets counters with no explicit reset path elsewhere: consecutive
    /// block/failure counters and the per-file edit streaks that feed
    /// `sunk_cost` detection, called on session-start so a resumed session
    /// doesn't inherit a prior run's thrash.
    pub fn reset_failure_counters(&mut self) {
        self.consecutive_blocks.clear();
        self.consecutive_failures = 0;
        self.edit_counts.clear();
    }
}
