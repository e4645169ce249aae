//! The composite runner's wire format: the JSON envelope read from
//! stdin and the decision JSON written to stdout, plus the in-process
//! `CheckOutcome` every check returns before it gets folded into a decision.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The shared envelope plus every event-specific field, deserialized with
/// `#[serde(default)]` on each optional slot since only a subset is present
/// for any given `hook_event_name`.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    pub session_id: String,
    #[serde(default)]
    pub transcript_path: Option<String>,
    pub hook_event_name: String,
    #[serde(default)]
    pub permission_mode: Option<String>,

    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: Option<Value>,
    #[serde(default)]
    pub tool_output: Option<Value>,
    #[serde(default)]
    pub tool_error: Option<String>,

    #[serde(default)]
    pub prompt: Option<String>,

    #[serde(default)]
    pub stop_hook_active: Option<bool>,

    #[serde(default)]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl EventEnvelope {
    pub fn kind(&self) -> Option<sentinel_core::EventKind> {
        use sentinel_core::EventKind::*;
        Some(match self.hook_event_name.as_str() {
            "PreToolUse" => PreToolUse,
            "PostToolUse" => PostToolUse,
            "UserPromptSubmit" => UserPromptSubmit,
            "Stop" => Stop,
            "SubagentStop" => SubagentStop,
            "SessionStart" => SessionStart,
            "SessionEnd" => SessionEnd,
            "Notification" => Notification,
            _ => return None,
        })
    }

    /// Best-effort path extraction from `tool_input`. Tool input schemas
    /// aren't fixed by the host, so this tries the field names actually
    /// seen in practice rather than assuming one canonical shape.
    pub fn file_path(&self) -> Option<&str> {
        let input = self.tool_input.as_ref()?;
        input
            .get("file_path")
            .or_else(|| input.get("path"))
            .and_then(Value::as_str)
    }

    /// Best-effort new-content extraction for write/edit-shaped tool input.
    pub fn new_content(&self) -> Option<&str> {
        let input = self.tool_input.as_ref()?;
        input
            .get("content")
            .or_else(|| input.get("new_string"))
            .and_then(Value::as_str)
    }

    pub fn old_content(&self) -> Option<&str> {
        self.tool_input.as_ref()?.get("old_string").and_then(Value::as_str)
    }

    pub fn bash_command(&self) -> Option<&str> {
        self.tool_input.as_ref()?.get("command").and_then(Value::as_str)
    }

    /// The search pattern for `Grep`-shaped tool input, used by
    /// `integration_gate` to tell a satisfying search from an unrelated one.
    pub fn search_pattern(&self) -> Option<&str> {
        self.tool_input.as_ref()?.get("pattern").and_then(Value::as_str)
    }

    pub fn is_write_tool(&self) -> bool {
        matches!(self.tool_name.as_deref(), Some("Write") | Some("Edit") | Some("MultiEdit") | Some("NotebookEdit"))
    }

    pub fn is_bash_tool(&self) -> bool {
        matches!(self.tool_name.as_deref(), Some("Bash"))
    }

    pub fn tool_output_text(&self) -> String {
        match &self.tool_output {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => self.tool_error.clone().unwrap_or_default(),
        }
    }
}

/// What a single check decided, before the registry folds all checks'
/// outcomes for an event into one `Decision`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Allow { context: Option<String> },
    Deny { reason: String },
    /// Stop-event only: forces the assistant to keep working.
    Block { reason: String },
}

impl CheckOutcome {
    pub fn allow() -> Self {
        CheckOutcome::Allow { context: None }
    }

    pub fn allow_with(context: impl Into<String>) -> Self {
        CheckOutcome::Allow { context: Some(context.into()) }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        CheckOutcome::Deny { reason: reason.into() }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        CheckOutcome::Block { reason: reason.into() }
    }
}

/// The decision JSON written to stdout. Shape varies by event kind;
/// `skip_serializing_if` keeps absent fields out of the object entirely so
/// "no opinion" round-trips to `{}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Decision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "stopReason")]
    pub stop_reason: Option<String>,
}

impl Decision {
    pub fn approve_with_context(context: Option<String>) -> Self {
        Decision { decision: Some("approve".into()), context, ..Default::default() }
    }

    pub fn deny(reason: String, context: Option<String>) -> Self {
        Decision { decision: Some("deny".into()), reason: Some(reason), context, ..Default::default() }
    }

    pub fn context_only(context: Option<String>) -> Self {
        Decision { context, ..Default::default() }
    }

    pub fn block(reason: String) -> Self {
        Decision { decision: Some("block".into()), reason: Some(reason), ..Default::default() }
    }

    pub fn stop_warning(reason: String) -> Self {
        Decision { stop_reason: Some(reason), ..Default::default() }
    }

    pub fn empty() -> Self {
        Decision::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_maps_known_event_names() {
        let mut env = sample_envelope();
        env.hook_event_name = "PreToolUse".into();
        assert_eq!(env.kind(), Some(sentinel_core::EventKind::PreToolUse));
    }

    #[test]
    fn test_kind_none_for_unknown_event() {
        let mut env = sample_envelope();
        env.hook_event_name = "SomeFutureEvent".into();
        assert_eq!(env.kind(), None);
    }

    #[test]
    fn test_file_path_prefers_file_path_field() {
        let mut env = sample_envelope();
        env.tool_input = Some(serde_json::json!({"file_path": "/a.rs", "path": "/b.rs"}));
        assert_eq!(env.file_path(), Some("/a.rs"));
    }

    #[test]
    fn test_decision_empty_serializes_to_empty_object() {
        let json = serde_json::to_string(&Decision::empty()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_decision_deny_serializes_expected_shape() {
        let d = Decision::deny("nope".into(), Some("ctx".into()));
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["decision"], "deny");
        assert_eq!(json["reason"], "nope");
        assert_eq!(json["context"], "ctx");
        assert!(json.get("stopReason").is_none());
    }

    fn sample_envelope() -> EventEnvelope {
        EventEnvelope {
            session_id: "s".into(),
            transcript_path: None,
            hook_event_name: "PreToolUse".into(),
            permission_mode: None,
            tool_name: None,
            tool_input: None,
            tool_output: None,
            tool_error: None,
            prompt: None,
            stop_hook_active: None,
            notification_type: None,
            message: None,
        }
    }
}
