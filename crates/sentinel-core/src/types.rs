//! Shared enums used across the state, confidence, and checks crates.

use serde::{Deserialize, Serialize};

/// Confidence tier, derived from the scalar 0-100 confidence value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Ignorance,
    Hypothesis,
    Working,
    Certainty,
    Trusted,
    Expert,
}

impl Tier {
    /// Maps a confidence scalar to its tier.
    pub fn from_confidence(confidence: i32) -> Self {
        match confidence {
            0..=10 => Tier::Ignorance,
            11..=30 => Tier::Hypothesis,
            31..=50 => Tier::Working,
            51..=70 => Tier::Certainty,
            71..=89 => Tier::Trusted,
            _ => Tier::Expert,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Ignorance => "IGNORANCE",
            Tier::Hypothesis => "HYPOTHESIS",
            Tier::Working => "WORKING",
            Tier::Certainty => "CERTAINTY",
            Tier::Trusted => "TRUSTED",
            Tier::Expert => "EXPERT",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Running classification of what kind of work the session is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    #[default]
    Unknown,
    Infrastructure,
    Development,
    Exploration,
    Data,
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Domain::Unknown => "unknown",
            Domain::Infrastructure => "infrastructure",
            Domain::Development => "development",
            Domain::Exploration => "exploration",
            Domain::Data => "data",
        };
        write!(f, "{s}")
    }
}

/// The hook event types the composite runner dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PreToolUse,
    PostToolUse,
    UserPromptSubmit,
    Stop,
    SubagentStop,
    SessionStart,
    SessionEnd,
    Notification,
}

impl EventKind {
    /// Gating events are the only ones whose verdict can deny the host action (glossary).
    pub fn is_gating(&self) -> bool {
        matches!(self, EventKind::PreToolUse | EventKind::UserPromptSubmit)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PreToolUse => "PreToolUse",
            EventKind::PostToolUse => "PostToolUse",
            EventKind::UserPromptSubmit => "UserPromptSubmit",
            EventKind::Stop => "Stop",
            EventKind::SubagentStop => "SubagentStop",
            EventKind::SessionStart => "SessionStart",
            EventKind::SessionEnd => "SessionEnd",
            EventKind::Notification => "Notification",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(Tier::from_confidence(0), Tier::Ignorance);
        assert_eq!(Tier::from_confidence(10), Tier::Ignorance);
        assert_eq!(Tier::from_confidence(11), Tier::Hypothesis);
        assert_eq!(Tier::from_confidence(30), Tier::Hypothesis);
        assert_eq!(Tier::from_confidence(31), Tier::Working);
        assert_eq!(Tier::from_confidence(50), Tier::Working);
        assert_eq!(Tier::from_confidence(51), Tier::Certainty);
        assert_eq!(Tier::from_confidence(70), Tier::Certainty);
        assert_eq!(Tier::from_confidence(71), Tier::Trusted);
        assert_eq!(Tier::from_confidence(89), Tier::Trusted);
        assert_eq!(Tier::from_confidence(90), Tier::Expert);
        assert_eq!(Tier::from_confidence(100), Tier::Expert);
    }

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Ignorance < Tier::Hypothesis);
        assert!(Tier::Trusted < Tier::Expert);
    }

    #[test]
    fn test_gating_events() {
        assert!(EventKind::PreToolUse.is_gating());
        assert!(EventKind::UserPromptSubmit.is_gating());
        assert!(!EventKind::PostToolUse.is_gating());
        assert!(!EventKind::Stop.is_gating());
        assert!(!EventKind::SessionStart.is_gating());
    }

    #[test]
    fn test_domain_default_is_unknown() {
        assert_eq!(Domain::default(), Domain::Unknown);
    }

    #[test]
    fn test_event_kind_serde_roundtrip() {
        let json = serde_json::to_string(&EventKind::PreToolUse).unwrap();
        assert_eq!(json, "\"pre_tool_use\"");
        let back: EventKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EventKind::PreToolUse);
    }
}
