//! Per-project session state: the single persisted entity the composite
//! runner loads, mutates, and saves atomically under the project lock.

pub mod manager;
pub mod migrate;
pub mod state;

pub use manager::{
    archive_dir, archive_snapshot, cooldowns_file_path, lock_file_path, load, reap_stale_archives,
    save, state_dir, state_file_path,
};
pub use state::{
    CommandRecord, ErrorEntry, EvidenceEntry, LastDeploy, PendingIntegrationGrep, SessionState,
    CURRENT_SCHEMA_VERSION, STARTING_CONFIDENCE,
};
