//! The bead client: a thin, non-fatal wrapper over the project's
//! external task tracker plus the append-only assignment ledger.
//!
//! Grounded on `bd_client.py` for the CLI shape and on `bead_claim.py` /
//! `bead_release.py` for the claim/release lifecycle. Every operation here
//! is advisory: a missing binary, a timeout, or a non-zero exit degrades
//! the feature rather than failing the turn.

pub mod client;
pub mod ledger;

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use ulid::Ulid;

pub use client::{Bead, BeadClient, BeadClientError};
pub use ledger::{default_path, Assignment, Ledger, ReleaseStatus};

/// Per-issue-type claim timeouts, mirroring `get_timeout_for_type`'s
/// intent: bugs and spikes get more slack than small chores.
fn timeout_for_type(issue_type: &str) -> Duration {
    let minutes = match issue_type {
        "bug" => 45,
        "feature" => 60,
        "chore" => 20,
        "spike" => 90,
        _ => 30,
    };
    Duration::from_secs(minutes * 60)
}

#[derive(Debug, thiserror::Error)]
pub enum BeadOpsError {
    #[error(transparent)]
    Client(#[from] BeadClientError),
    #[error("io error talking to the assignment ledger: {0}")]
    Io(#[from] std::io::Error),
    #[error("bead {0} is already claimed and unreleased")]
    AlreadyClaimed(String),
    #[error("bead {0} not found")]
    NotFound(String),
    #[error("bead {0} is already closed")]
    AlreadyClosed(String),
}

/// Ties a `BeadClient` to a project's assignment ledger. One instance per
/// runner invocation, matching the client's own per-process cache.
pub struct BeadOps {
    client: BeadClient,
    ledger: Ledger,
}

impl BeadOps {
    pub fn new(client: BeadClient, project_root: &Path) -> Self {
        BeadOps {
            client,
            ledger: Ledger::new(default_path(project_root)),
        }
    }

    pub fn discover(project_root: &Path) -> Result<Self, BeadOpsError> {
        Ok(Self::new(BeadClient::discover()?, project_root))
    }

    pub async fn list(&mut self, status: Option<&str>) -> Result<Vec<Bead>, BeadClientError> {
        self.client.list(status).await
    }

    pub async fn ready(&mut self, limit: u32) -> Result<Vec<Bead>, BeadClientError> {
        self.client.ready(limit).await
    }

    pub async fn blocked(&mut self) -> Result<Vec<Bead>, BeadClientError> {
        self.client.blocked().await
    }

    pub async fn create(&mut self, title: &str, issue_type: &str, priority: &str) -> Result<Bead, BeadClientError> {
        self.client.create(title, issue_type, priority).await
    }

    /// Validates the bead exists and isn't closed, moves it to
    /// `in_progress`, and records a new, unreleased ledger entry. Resuming
    /// the same bead under the same agent session is tolerated (matches
    /// an existing unreleased entry rather than rejecting); any other
    /// agent holding an unreleased claim is rejected.
    pub async fn claim(
        &mut self,
        bead_id: &str,
        agent_session_id: &str,
        parent_session_id: Option<&str>,
        prompt_snippet: Option<&str>,
    ) -> Result<Assignment, BeadOpsError> {
        let bead = self
            .client
            .show(bead_id)
            .await?
            .ok_or_else(|| BeadOpsError::NotFound(bead_id.to_string()))?;
        if bead.status == "closed" {
            return Err(BeadOpsError::AlreadyClosed(bead_id.to_string()));
        }

        if let Some(existing) = self.ledger.unreleased_for_agent(bead_id, agent_session_id)? {
            return Ok(existing);
        }
        if self.ledger.has_unreleased(bead_id)? {
            return Err(BeadOpsError::AlreadyClaimed(bead_id.to_string()));
        }

        self.client.update(bead_id, "in_progress").await?;

        let now = Utc::now();
        let assignment = Assignment {
            assignment_id: Ulid::new().to_string(),
            bead_id: bead_id.to_string(),
            agent_session_id: agent_session_id.to_string(),
            parent_session_id: parent_session_id.map(String::from),
            prompt_snippet: prompt_snippet.map(String::from),
            claimed_at: now,
            expected_deadline: now
                + chrono::Duration::from_std(timeout_for_type(&bead.issue_type)).unwrap_or_default(),
            released_at: None,
            release_status: None,
        };
        self.ledger.claim(&assignment)?;
        Ok(assignment)
    }

    /// Closes the bead and appends a release record regardless of whether
    /// the close call succeeded, since the bead may already be closed —
    /// the ledger's release state should still reflect this agent's intent.
    pub async fn release(
        &mut self,
        bead_id: &str,
        agent_session_id: &str,
        status: ReleaseStatus,
    ) -> Result<(), BeadOpsError> {
        let assignment = self
            .ledger
            .unreleased_for_agent(bead_id, agent_session_id)?
            .ok_or_else(|| BeadOpsError::NotFound(bead_id.to_string()))?;

        let close_result = self.client.close(bead_id).await;
        if let Err(err) = &close_result {
            tracing::warn!(bead_id, error = %err, "bd close failed; releasing assignment anyway");
        }

        self.ledger.release(&assignment.assignment_id, Utc::now(), status)?;
        Ok(())
    }
}
