//! PreToolUse checks: the only event, besides `UserPromptSubmit`, whose
//! `Deny` actually blocks the host action.

use sentinel_confidence::constants::{THRESHOLD_PRODUCTION_ACCESS, THRESHOLD_REQUIRE_RESEARCH};
use sentinel_core::patterns;

use crate::event::CheckOutcome;
use crate::registry::{Check, CheckContext, CheckRegistry, ToolFilter};

const PRODUCTION_SENSITIVE_COMMANDS: &[&str] = &["deploy", "migrate", "drop table", "force-push", "push --force"];

/// Denies any path that traverses into a nested `.claude/.claude` tree, the
/// signature left behind by a runaway recursive copy or a subagent spawning
/// into its own working directory.
fn recursion_guard(ctx: &mut CheckContext) -> CheckOutcome {
    let hits = |s: &str| s.contains(".claude/.claude");
    if ctx.event.file_path().map(hits).unwrap_or(false) || ctx.event.bash_command().map(hits).unwrap_or(false) {
        return CheckOutcome::deny("path traverses into a nested .claude/.claude directory");
    }
    CheckOutcome::allow()
}

/// Denies bash commands that spin an unbounded shell loop without a timeout
/// wrapper — `while true` / `for ((;;))` with nothing bounding it.
fn loop_detector(ctx: &mut CheckContext) -> CheckOutcome {
    let Some(command) = ctx.event.bash_command() else {
        return CheckOutcome::allow();
    };
    let unbounded = command.contains("while true") || command.contains("for ((;;))") || command.contains("for(;;)");
    if unbounded && !command.contains("timeout") {
        return CheckOutcome::deny(format!("`{command}` runs an unbounded loop with no timeout wrapper"));
    }
    CheckOutcome::allow()
}

/// Denies writes whose new content contains an `eval`/`exec` call on a
/// non-literal argument or a SQL statement built by string concatenation.
fn content_gate(ctx: &mut CheckContext) -> CheckOutcome {
    if !ctx.event.is_write_tool() {
        return CheckOutcome::allow();
    }
    let Some(content) = ctx.event.new_content() else {
        return CheckOutcome::allow();
    };
    if patterns::contains_unsafe_eval(content) {
        return CheckOutcome::deny("new content calls eval()/exec() with a non-literal argument");
    }
    if patterns::contains_sql_injection_risk(content) {
        return CheckOutcome::deny("new content builds a SQL statement by string concatenation; use a parameterized query");
    }
    CheckOutcome::allow()
}

/// Denies an edit to a file this session hasn't read yet, unless the write
/// is creating that file for the first time.
fn gap_detector(ctx: &mut CheckContext) -> CheckOutcome {
    if !ctx.event.is_write_tool() {
        return CheckOutcome::allow();
    }
    let Some(path) = ctx.event.file_path() else {
        return CheckOutcome::allow();
    };
    let already_known = ctx.state.has_read(path)
        || ctx.state.files_edited.iter().any(|p| p == path)
        || ctx.state.files_created.iter().any(|p| p == path);
    let is_creation = ctx.event.tool_name.as_deref() == Some("Write") && !already_known;
    if is_creation {
        ctx.state.record_file_created(path, ctx.turn);
        return CheckOutcome::allow();
    }
    if !ctx.state.has_read(path) {
        return CheckOutcome::deny(format!("{path} hasn't been read this session; read it before editing"));
    }
    CheckOutcome::allow()
}

/// Tracks function-signature changes: a write that changes or adds a
/// signature seeds a `pending_integration_grep` entry naming this file. A
/// `Grep` call for that function name satisfies it; any further edit to a
/// *different* file while an entry is still outstanding is denied.
fn integration_gate(ctx: &mut CheckContext) -> CheckOutcome {
    if ctx.event.tool_name.as_deref() == Some("Grep") {
        if let Some(pattern) = ctx.event.search_pattern() {
            ctx.state.pending_integration_greps.retain(|p| !pattern.contains(&p.function_name));
        }
        return CheckOutcome::allow();
    }
    if !ctx.event.is_write_tool() {
        return CheckOutcome::allow();
    }
    let path = ctx.event.file_path().unwrap_or("").to_string();

    if let (Some(old), Some(new)) = (ctx.event.old_content(), ctx.event.new_content()) {
        let extension = path.rsplit('.').next();
        let old_sigs = patterns::extract_function_signatures(old, extension);
        let new_sigs = patterns::extract_function_signatures(new, extension);
        for sig in new_sigs {
            let unchanged = old_sigs.iter().any(|o| o.name == sig.name && o.params == sig.params);
            if unchanged {
                continue;
            }
            let already_tracked = ctx
                .state
                .pending_integration_greps
                .iter()
                .any(|p| p.function_name == sig.name && p.source_file == path);
            if !already_tracked {
                ctx.state.pending_integration_greps.push(sentinel_state::PendingIntegrationGrep {
                    function_name: sig.name,
                    source_file: path.clone(),
                    recorded_turn: ctx.turn,
                });
            }
        }
    }

    if let Some(pending) = ctx.state.pending_integration_greps.iter().find(|p| p.source_file != path) {
        return CheckOutcome::deny(format!(
            "{} in {} changed signature and hasn't been grepped for call sites; search for it before editing another file",
            pending.function_name, pending.source_file
        ));
    }
    CheckOutcome::allow()
}

/// After two consecutive tool failures, denies further edits until an
/// external-consult tool (`WebSearch`/`WebFetch`) has been invoked.
fn oracle_gate(ctx: &mut CheckContext) -> CheckOutcome {
    if matches!(ctx.event.tool_name.as_deref(), Some("WebSearch") | Some("WebFetch")) {
        ctx.state.consecutive_failures = 0;
        return CheckOutcome::allow();
    }
    if !ctx.event.is_write_tool() {
        return CheckOutcome::allow();
    }
    let threshold = sentinel_confidence::constants::ORACLE_GATE_FAILURE_THRESHOLD;
    if ctx.state.consecutive_failures >= threshold {
        return CheckOutcome::deny(format!(
            "{} consecutive tool failures with no external consult since; invoke WebSearch or WebFetch before the next edit",
            ctx.state.consecutive_failures
        ));
    }
    CheckOutcome::allow()
}

/// Denies actions that require a confidence tier above the current one:
/// production-sensitive commands below the production-access threshold, and
/// writes that introduce an unresearched library below the research
/// threshold.
fn confidence_tier_gate(ctx: &mut CheckContext) -> CheckOutcome {
    if let Some(command) = ctx.event.bash_command() {
        let production_sensitive = PRODUCTION_SENSITIVE_COMMANDS.iter().any(|kw| command.contains(kw));
        if production_sensitive && ctx.state.confidence < THRESHOLD_PRODUCTION_ACCESS {
            return CheckOutcome::deny(format!(
                "confidence {} is below the production-access threshold of {THRESHOLD_PRODUCTION_ACCESS}",
                ctx.state.confidence
            ));
        }
    }
    if let Some(content) = ctx.event.new_content() {
        if ctx.state.confidence < THRESHOLD_REQUIRE_RESEARCH {
            for lib in extract_use_crates(content) {
                if !ctx.state.libraries_researched.contains(&lib) {
                    return CheckOutcome::deny(format!(
                        "`{lib}` hasn't been researched and confidence {} is below {THRESHOLD_REQUIRE_RESEARCH}",
                        ctx.state.confidence
                    ));
                }
            }
        }
    }
    CheckOutcome::allow()
}

/// Requires an active, unreleased bead claim for this session before a
/// write lands, once the rollout has reached the enforcement phase — unless
/// the session is still young or the edit lives under `.claude/`.
fn bead_enforcement(ctx: &mut CheckContext) -> CheckOutcome {
    if !ctx.event.is_write_tool() || ctx.settings.rollout_phase < 2 {
        return CheckOutcome::allow();
    }
    if ctx.turn <= 2 {
        return CheckOutcome::allow();
    }
    if ctx.event.file_path().map(|p| p.contains(".claude/")).unwrap_or(false) {
        return CheckOutcome::allow();
    }
    let cwd = std::env::current_dir().unwrap_or_default();
    let Ok(project_root) = sentinel_core::project::find_project_root(&cwd) else {
        return CheckOutcome::allow();
    };
    let ledger = sentinel_beads::Ledger::new(sentinel_beads::default_path(&project_root));
    let Ok(assignments) = ledger.fold() else {
        return CheckOutcome::allow();
    };
    let has_active = assignments
        .iter()
        .any(|a| a.agent_session_id == ctx.event.session_id && a.released_at.is_none());
    if has_active {
        CheckOutcome::allow()
    } else {
        CheckOutcome::deny("no active bead claim for this session; claim a bead before editing files")
    }
}

/// Suggests spawning a subagent per ready bead instead of working several
/// beads serially in one session, when more than one is in flight.
fn parallel_bead_delegation(ctx: &mut CheckContext) -> CheckOutcome {
    if ctx.event.tool_name.as_deref() != Some("Task") {
        return CheckOutcome::allow();
    }
    let ready_count = ctx.state.work_items.len();
    if ready_count > 1 {
        CheckOutcome::allow_with(format!(
            "{ready_count} items are tracked as in-flight work; consider delegating independent ones to separate subagents"
        ))
    } else {
        CheckOutcome::allow()
    }
}

/// Flags a write that introduces an import for a library never seen as
/// researched or used this session.
fn dependency_check(ctx: &mut CheckContext) -> CheckOutcome {
    if !ctx.event.is_write_tool() {
        return CheckOutcome::allow();
    }
    let Some(content) = ctx.event.new_content() else {
        return CheckOutcome::allow();
    };
    let unresearched: Vec<String> = extract_use_crates(content)
        .into_iter()
        .filter(|name| !ctx.state.libraries_used.contains(name) && !ctx.state.libraries_researched.contains(name))
        .collect();
    if unresearched.is_empty() {
        CheckOutcome::allow()
    } else {
        CheckOutcome::allow_with(format!("references unresearched dependencies: {}", unresearched.join(", ")))
    }
}

/// Pulls candidate crate names out of `use X::...` lines, skipping the
/// language's own reserved path roots.
fn extract_use_crates(content: &str) -> Vec<String> {
    content
        .lines()
        .take(50)
        .filter_map(|line| {
            let trimmed = line.trim();
            let name = trimmed.strip_prefix("use ")?.split("::").next()?.trim_end_matches(';');
            if name.is_empty() || ["std", "crate", "self", "super"].contains(&name) {
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

pub fn register(registry: &mut CheckRegistry) {
    registry.register_pre_tool_use(Check { name: "recursion_guard", priority: 5, tool_filter: ToolFilter::Any, run: recursion_guard });
    registry.register_pre_tool_use(Check { name: "loop_detector", priority: 10, tool_filter: ToolFilter::Any, run: loop_detector });
    registry.register_pre_tool_use(Check { name: "parallel_bead_delegation", priority: 3, tool_filter: ToolFilter::Any, run: parallel_bead_delegation });
    registry.register_pre_tool_use(Check { name: "bead_enforcement", priority: 4, tool_filter: ToolFilter::Any, run: bead_enforcement });
    registry.register_pre_tool_use(Check { name: "oracle_gate", priority: 30, tool_filter: ToolFilter::Any, run: oracle_gate });
    registry.register_pre_tool_use(Check { name: "integration_gate", priority: 35, tool_filter: ToolFilter::Any, run: integration_gate });
    registry.register_pre_tool_use(Check { name: "confidence_tier_gate", priority: 36, tool_filter: ToolFilter::Any, run: confidence_tier_gate });
    registry.register_pre_tool_use(Check { name: "content_gate", priority: 45, tool_filter: ToolFilter::Any, run: content_gate });
    registry.register_pre_tool_use(Check { name: "gap_detector", priority: 50, tool_filter: ToolFilter::Any, run: gap_detector });
    registry.register_pre_tool_use(Check { name: "dependency_check", priority: 55, tool_filter: ToolFilter::Any, run: dependency_check });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HookSettings;
    use crate::event::EventEnvelope;
    use chrono::Utc;
    use sentinel_lock::cooldown::CooldownStore;
    use sentinel_state::SessionState;

    fn envelope(tool_name: Option<&str>, tool_input: Option<serde_json::Value>) -> EventEnvelope {
        EventEnvelope {
            session_id: "sess-1".into(),
            transcript_path: None,
            hook_event_name: "PreToolUse".into(),
            permission_mode: None,
            tool_name: tool_name.map(String::from),
            tool_input,
            tool_output: None,
            tool_error: None,
            prompt: None,
            stop_hook_active: None,
            notification_type: None,
            message: None,
        }
    }

    fn context<'a>(
        event: &'a EventEnvelope,
        state: &'a mut SessionState,
        cooldowns: &'a mut CooldownStore,
        settings: &'a HookSettings,
        turn: u64,
    ) -> CheckContext<'a> {
        CheckContext { event, state, cooldowns, settings, turn, now: Utc::now() }
    }

    #[test]
    fn test_recursion_guard_denies_nested_claude_path() {
        let event = envelope(Some("Write"), Some(serde_json::json!({"file_path": "/proj/.claude/.claude/x.rs"})));
        let mut state = SessionState::new("s", "p", "/tmp/p");
        let mut cooldowns = CooldownStore::load(&std::path::PathBuf::from("/tmp/no-such-file.json"));
        let settings = HookSettings::default();
        let outcome = recursion_guard(&mut context(&event, &mut state, &mut cooldowns, &settings, 1));
        assert!(matches!(outcome, CheckOutcome::Deny { .. }));
    }

    #[test]
    fn test_loop_detector_denies_unbounded_loop_without_timeout() {
        let event = envelope(Some("Bash"), Some(serde_json::json!({"command": "while true; do ping host; done"})));
        let mut state = SessionState::new("s", "p", "/tmp/p");
        let mut cooldowns = CooldownStore::load(&std::path::PathBuf::from("/tmp/no-such-file2.json"));
        let settings = HookSettings::default();
        let outcome = loop_detector(&mut context(&event, &mut state, &mut cooldowns, &settings, 1));
        assert!(matches!(outcome, CheckOutcome::Deny { .. }));
    }

    #[test]
    fn test_loop_detector_allows_when_timeout_wraps_it() {
        let event = envelope(Some("Bash"), Some(serde_json::json!({"command": "timeout 5 while true; do ping host; done"})));
        let mut state = SessionState::new("s", "p", "/tmp/p");
        let mut cooldowns = CooldownStore::load(&std::path::PathBuf::from("/tmp/no-such-file2b.json"));
        let settings = HookSettings::default();
        let outcome = loop_detector(&mut context(&event, &mut state, &mut cooldowns, &settings, 1));
        assert_eq!(outcome, CheckOutcome::allow());
    }

    #[test]
    fn test_content_gate_denies_unsafe_eval() {
        let event = envelope(Some("Write"), Some(serde_json::json!({"file_path": "src/foo.rs", "content": "eval(user_input)"})));
        let mut state = SessionState::new("s", "p", "/tmp/p");
        let mut cooldowns = CooldownStore::load(&std::path::PathBuf::from("/tmp/no-such-file3.json"));
        let settings = HookSettings::default();
        let outcome = content_gate(&mut context(&event, &mut state, &mut cooldowns, &settings, 1));
        assert!(matches!(outcome, CheckOutcome::Deny { .. }));
    }

    #[test]
    fn test_content_gate_allows_literal_eval() {
        let event = envelope(Some("Write"), Some(serde_json::json!({"file_path": "src/foo.rs", "content": "eval(\"2 + 2\")"})));
        let mut state = SessionState::new("s", "p", "/tmp/p");
        let mut cooldowns = CooldownStore::load(&std::path::PathBuf::from("/tmp/no-such-file4.json"));
        let settings = HookSettings::default();
        let outcome = content_gate(&mut context(&event, &mut state, &mut cooldowns, &settings, 1));
        assert_eq!(outcome, CheckOutcome::allow());
    }

    #[test]
    fn test_gap_detector_allows_creation_of_unread_file() {
        let event = envelope(Some("Write"), Some(serde_json::json!({"file_path": "src/new.rs", "content": "fn x() {}"})));
        let mut state = SessionState::new("s", "p", "/tmp/p");
        let mut cooldowns = CooldownStore::load(&std::path::PathBuf::from("/tmp/no-such-file5.json"));
        let settings = HookSettings::default();
        let outcome = gap_detector(&mut context(&event, &mut state, &mut cooldowns, &settings, 1));
        assert_eq!(outcome, CheckOutcome::allow());
        assert!(state.files_created.iter().any(|p| p == "src/new.rs"));
    }

    #[test]
    fn test_gap_detector_denies_edit_to_unread_existing_file() {
        let event = envelope(Some("Edit"), Some(serde_json::json!({"file_path": "src/old.rs", "new_string": "x"})));
        let mut state = SessionState::new("s", "p", "/tmp/p");
        let mut cooldowns = CooldownStore::load(&std::path::PathBuf::from("/tmp/no-such-file6.json"));
        let settings = HookSettings::default();
        let outcome = gap_detector(&mut context(&event, &mut state, &mut cooldowns, &settings, 1));
        assert!(matches!(outcome, CheckOutcome::Deny { .. }));
    }

    #[test]
    fn test_integration_gate_seeds_entry_from_parameter_change() {
        let event = envelope(
            Some("Edit"),
            Some(serde_json::json!({
                "file_path": "src/a.rs",
                "old_string": "fn process(x: i32) -> i32 { x }",
                "new_string": "fn process(x: i32, y: i32) -> i32 { x + y }",
            })),
        );
        let mut state = SessionState::new("s", "p", "/tmp/p");
        let mut cooldowns = CooldownStore::load(&std::path::PathBuf::from("/tmp/no-such-file7b.json"));
        let settings = HookSettings::default();
        integration_gate(&mut context(&event, &mut state, &mut cooldowns, &settings, 1));
        assert_eq!(state.pending_integration_greps.len(), 1);
        assert_eq!(state.pending_integration_greps[0].function_name, "process");

        let other_file_edit = envelope(Some("Edit"), Some(serde_json::json!({"file_path": "src/b.rs", "new_string": "x"})));
        let outcome = integration_gate(&mut context(&other_file_edit, &mut state, &mut cooldowns, &settings, 2));
        match outcome {
            CheckOutcome::Deny { reason } => assert!(reason.contains("process")),
            other => panic!("expected Deny, got {other:?}"),
        }
    }

    #[test]
    fn test_integration_gate_denies_other_file_until_grepped() {
        let mut state = SessionState::new("s", "p", "/tmp/p");
        state.pending_integration_greps.push(sentinel_state::PendingIntegrationGrep {
            function_name: "do_thing".into(),
            source_file: "src/a.rs".into(),
            recorded_turn: 1,
        });
        let event = envelope(Some("Edit"), Some(serde_json::json!({"file_path": "src/b.rs", "new_string": "x"})));
        let mut cooldowns = CooldownStore::load(&std::path::PathBuf::from("/tmp/no-such-file7.json"));
        let settings = HookSettings::default();
        let outcome = integration_gate(&mut context(&event, &mut state, &mut cooldowns, &settings, 2));
        assert!(matches!(outcome, CheckOutcome::Deny { .. }));
    }

    #[test]
    fn test_integration_gate_grep_satisfies_pending_entry() {
        let mut state = SessionState::new("s", "p", "/tmp/p");
        state.pending_integration_greps.push(sentinel_state::PendingIntegrationGrep {
            function_name: "do_thing".into(),
            source_file: "src/a.rs".into(),
            recorded_turn: 1,
        });
        let grep_event = envelope(Some("Grep"), Some(serde_json::json!({"pattern": "do_thing"})));
        let mut cooldowns = CooldownStore::load(&std::path::PathBuf::from("/tmp/no-such-file8.json"));
        let settings = HookSettings::default();
        integration_gate(&mut context(&grep_event, &mut state, &mut cooldowns, &settings, 2));
        assert!(state.pending_integration_greps.is_empty());

        let edit_event = envelope(Some("Edit"), Some(serde_json::json!({"file_path": "src/b.rs", "new_string": "x"})));
        let outcome = integration_gate(&mut context(&edit_event, &mut state, &mut cooldowns, &settings, 3));
        assert_eq!(outcome, CheckOutcome::allow());
    }

    #[test]
    fn test_oracle_gate_denies_after_two_failures_until_consult() {
        let event = envelope(Some("Write"), Some(serde_json::json!({"file_path": "src/a.rs", "content": "x"})));
        let mut state = SessionState::new("s", "p", "/tmp/p");
        state.consecutive_failures = 2;
        let mut cooldowns = CooldownStore::load(&std::path::PathBuf::from("/tmp/no-such-file9.json"));
        let settings = HookSettings::default();
        let outcome = oracle_gate(&mut context(&event, &mut state, &mut cooldowns, &settings, 1));
        assert!(matches!(outcome, CheckOutcome::Deny { .. }));

        let consult_event = envelope(Some("WebSearch"), None);
        oracle_gate(&mut context(&consult_event, &mut state, &mut cooldowns, &settings, 2));
        assert_eq!(state.consecutive_failures, 0);
        let outcome_after = oracle_gate(&mut context(&event, &mut state, &mut cooldowns, &settings, 3));
        assert_eq!(outcome_after, CheckOutcome::allow());
    }

    #[test]
    fn test_confidence_tier_gate_denies_low_confidence_production_command() {
        let event = envelope(Some("Bash"), Some(serde_json::json!({"command": "make deploy"})));
        let mut state = SessionState::new("s", "p", "/tmp/p");
        state.confidence = 40;
        let mut cooldowns = CooldownStore::load(&std::path::PathBuf::from("/tmp/no-such-file10.json"));
        let settings = HookSettings::default();
        let outcome = confidence_tier_gate(&mut context(&event, &mut state, &mut cooldowns, &settings, 1));
        assert!(matches!(outcome, CheckOutcome::Deny { .. }));
    }

    #[test]
    fn test_bead_enforcement_allows_young_session() {
        let event = envelope(Some("Write"), Some(serde_json::json!({"file_path": "src/a.rs", "content": "x"})));
        let mut state = SessionState::new("s", "p", "/tmp/p");
        let mut cooldowns = CooldownStore::load(&std::path::PathBuf::from("/tmp/no-such-file11.json"));
        let mut settings = HookSettings::default();
        settings.rollout_phase = 2;
        let outcome = bead_enforcement(&mut context(&event, &mut state, &mut cooldowns, &settings, 1));
        assert_eq!(outcome, CheckOutcome::allow());
    }
}
