use clap::{Parser, Subcommand};

/// The composite runner. Invoked by the host with a hook event JSON object
/// on stdin and no arguments for the common case; `ops` subcommands are
/// for interactive/maintenance use outside the hook path.
#[derive(Parser)]
#[command(name = "sentinel", version, about = "Interposition layer for an AI coding assistant")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Maintenance and introspection commands that don't go through the
    /// hook event pipeline.
    Ops {
        #[command(subcommand)]
        cmd: OpsCommands,
    },
}

#[derive(Subcommand)]
pub enum OpsCommands {
    /// Checks the persisted state file against its invariants: confidence
    /// bounds, ledger caps, goal-anchor consistency.
    Verify,
    /// Records a false-positive dispute against a reducer by name,
    /// stretching its cooldown the next time it fires.
    Fp { reducer: String },
    /// Lists every registered check per event kind.
    CapabilityInventory,
    /// Removes stale lock files and reaps `.claude/tmp/mastermind_*.json`
    /// session-end archives older than `max_age_hours`.
    Cleanup {
        #[arg(long)]
        dry_run: bool,
        #[arg(long, default_value_t = 24)]
        max_age_hours: i64,
    },
    /// Rewrites a state file to the current schema version.
    StateMigrate,
}
