//! The signal surface the confidence engine reacts to.
//!
//! Reducers and increasers are defined as `matcher: fn(&event, &state) ->
//! bool`. The "event" they close over is this `TurnContext`: a
//! pre-interpreted summary of what happened this turn, assembled by the
//! composite runner and check library from the raw hook JSON before the
//! engine ever runs. Keeping the engine decoupled from the hook wire format
//! means it can be exercised with synthetic contexts in tests, matching the
//! "tagged variants plus a dispatch table" design note.

use crate::tool_debt::DebtFamily;

#[derive(Debug, Clone, Default)]
pub struct TurnContext {
    pub tool_name: Option<String>,
    pub tool_succeeded: Option<bool>,
    pub prompt_text: Option<String>,
    pub assistant_text: Option<String>,

    /// Path of the file this turn's edit targeted, if any.
    pub edited_path: Option<String>,
    /// Opaque hash of the region an edit touched, for oscillation detection.
    pub edit_region_hash: Option<String>,
    pub changed_line_count: Option<u32>,

    pub is_test_command: bool,
    pub is_build_command: bool,
    pub is_lint_command: bool,
    pub is_productive_bash: bool,
    pub is_search_tool: bool,
    pub is_file_read: bool,
    pub is_git_exploration: bool,
    pub is_memory_consult: bool,
    pub is_ask_user: bool,
    pub is_bead_create: bool,
    pub is_rules_update: bool,
    pub is_momentum_forward: bool,
    pub trust_regained: bool,

    pub created_backup_file: bool,
    pub created_version_suffixed_file: bool,
    pub created_standalone_markdown: bool,

    /// Name of the check that denied this turn's action, if any.
    pub hook_blocked_check: Option<String>,

    /// Tool-debt families touched this turn.
    pub debt_families_used: Vec<DebtFamily>,

    pub realignment_marker_present: bool,

    /// `FP:<reducer>` or `/dispute <reducer>` parsed out of the prompt.
    pub dispute_target: Option<String>,
}

impl TurnContext {
    pub fn new() -> Self {
        Self::default()
    }
}
