//! Error taxonomy for the composite hook runner.
//!
//! Every variant here is something
//! a check or the runner can recover from (fall back to a default, degrade,
//! or no-op) rather than something that should ever reach the host process
//! as a non-zero exit.

#[derive(thiserror::Error, Debug)]
pub enum SentinelError {
    #[error("session state is corrupt: {0}")]
    StateCorrupt(String),

    #[error("failed to acquire project lock within {0:?}")]
    LockTimeout(std::time::Duration),

    #[error("invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: String, reason: String },

    #[error("external tool '{0}' unavailable: {1}")]
    ExternalToolUnavailable(String, String),

    #[error("malformed hook event payload: {0}")]
    ProtocolError(String),

    #[error("no project root found above {0}")]
    ProjectRootNotFound(String),
}
