//! The check registry: a priority-sorted, per-event-type list of
//! checks populated by explicit registration calls rather than decorator or
//! import-time side effects.

use chrono::{DateTime, Utc};
use sentinel_core::EventKind;
use sentinel_lock::cooldown::CooldownStore;
use sentinel_state::SessionState;

use crate::config::{is_disabled, HookSettings};
use crate::event::{CheckOutcome, EventEnvelope};

/// Everything a check's `run` function needs, bundled so adding a new
/// dependency doesn't change every check's signature.
pub struct CheckContext<'a> {
    pub event: &'a EventEnvelope,
    pub state: &'a mut SessionState,
    pub cooldowns: &'a mut CooldownStore,
    pub settings: &'a HookSettings,
    pub turn: u64,
    pub now: DateTime<Utc>,
}

pub type CheckFn = fn(&mut CheckContext) -> CheckOutcome;

/// A tool-name filter. Most checks run for every tool; a handful only make
/// sense for a specific one (`auto_commit` only cares about `Bash`).
#[derive(Debug, Clone, Copy)]
pub enum ToolFilter {
    Any,
    Only(&'static str),
}

impl ToolFilter {
    fn matches(&self, tool_name: Option<&str>) -> bool {
        match self {
            ToolFilter::Any => true,
            ToolFilter::Only(name) => tool_name == Some(*name),
        }
    }
}

pub struct Check {
    pub name: &'static str,
    /// Lower fires first, matching spec.md's priority convention (1 is
    /// most urgent).
    pub priority: i32,
    pub tool_filter: ToolFilter,
    pub run: CheckFn,
}

#[derive(Default)]
pub struct CheckRegistry {
    pre_tool_use: Vec<Check>,
    post_tool_use: Vec<Check>,
    user_prompt_submit: Vec<Check>,
    stop: Vec<Check>,
    subagent_stop: Vec<Check>,
    session_start: Vec<Check>,
    session_end: Vec<Check>,
    notification: Vec<Check>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pre_tool_use(&mut self, check: Check) {
        self.pre_tool_use.push(check);
    }

    pub fn register_post_tool_use(&mut self, check: Check) {
        self.post_tool_use.push(check);
    }

    pub fn register_user_prompt_submit(&mut self, check: Check) {
        self.user_prompt_submit.push(check);
    }

    pub fn register_stop(&mut self, check: Check) {
        self.stop.push(check);
    }

    pub fn register_subagent_stop(&mut self, check: Check) {
        self.subagent_stop.push(check);
    }

    pub fn register_session_start(&mut self, check: Check) {
        self.session_start.push(check);
    }

    pub fn register_session_end(&mut self, check: Check) {
        self.session_end.push(check);
    }

    pub fn register_notification(&mut self, check: Check) {
        self.notification.push(check);
    }

    /// Stable-sorts every list by priority. Call once after every
    /// `register_*` call has run (see `bootstrap`).
    pub fn finalize(&mut self) {
        for list in [
            &mut self.pre_tool_use,
            &mut self.post_tool_use,
            &mut self.user_prompt_submit,
            &mut self.stop,
            &mut self.subagent_stop,
            &mut self.session_start,
            &mut self.session_end,
            &mut self.notification,
        ] {
            list.sort_by_key(|c| c.priority);
        }
    }

    pub fn for_event(&self, kind: EventKind) -> &[Check] {
        match kind {
            EventKind::PreToolUse => &self.pre_tool_use,
            EventKind::PostToolUse => &self.post_tool_use,
            EventKind::UserPromptSubmit => &self.user_prompt_submit,
            EventKind::Stop => &self.stop,
            EventKind::SubagentStop => &self.subagent_stop,
            EventKind::SessionStart => &self.session_start,
            EventKind::SessionEnd => &self.session_end,
            EventKind::Notification => &self.notification,
        }
    }

    /// Runs every live check for `kind` against `ctx` in priority order,
    /// returning each outcome paired with the check's name. Gating/
    /// short-circuit behavior is the caller's responsibility since it
    /// differs by event kind, not by registry mechanics.
    pub fn dispatch(&self, kind: EventKind, ctx: &mut CheckContext) -> Vec<(&'static str, CheckOutcome)> {
        let mut outcomes = Vec::new();
        for check in self.for_event(kind) {
            if is_disabled(check.name) {
                continue;
            }
            if !check.tool_filter.matches(ctx.event.tool_name.as_deref()) {
                continue;
            }
            let outcome = (check.run)(ctx);
            let is_deny = matches!(outcome, CheckOutcome::Deny { .. });
            outcomes.push((check.name, outcome));
            if kind.is_gating() && is_deny {
                break;
            }
        }
        outcomes
    }
}

/// Builds the registry by explicitly registering every check in the library.
/// This is the crate's single composition root — no check registers itself
/// via a macro or static constructor.
pub fn bootstrap() -> CheckRegistry {
    let mut registry = CheckRegistry::new();
    crate::checks::register_all(&mut registry);
    registry.finalize();
    registry
}
