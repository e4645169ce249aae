//! The required increaser table: positive confidence signals. Three
//! of these (`file_read`, `productive_bash`, `search_tool`) are farmable and
//! get diminishing-returns treatment in the engine rather than here.

use sentinel_state::SessionState;

use crate::context::TurnContext;

pub struct Increaser {
    pub name: &'static str,
    pub delta: i32,
    pub matcher: fn(&TurnContext, &SessionState) -> bool,
}

fn tests_passed(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.is_test_command && ctx.tool_succeeded == Some(true)
}

fn build_succeeded(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.is_build_command && ctx.tool_succeeded == Some(true)
}

fn lint_clean(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.is_lint_command && ctx.tool_succeeded == Some(true)
}

fn productive_bash(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.is_productive_bash && ctx.tool_succeeded == Some(true)
}

fn memory_consult(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.is_memory_consult
}

fn file_read(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.is_file_read
}

fn search_tool(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.is_search_tool
}

fn git_exploration(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.is_git_exploration
}

fn ask_user(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.is_ask_user
}

fn bead_create(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.is_bead_create
}

fn rules_update(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.is_rules_update
}

fn momentum_forward(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.is_momentum_forward
}

fn trust_regained(ctx: &TurnContext, _state: &SessionState) -> bool {
    ctx.trust_regained
}

pub const INCREASERS: &[Increaser] = &[
    Increaser { name: "tests_passed", delta: 4, matcher: tests_passed },
    Increaser { name: "build_succeeded", delta: 5, matcher: build_succeeded },
    Increaser { name: "lint_clean", delta: 3, matcher: lint_clean },
    Increaser { name: "productive_bash", delta: 3, matcher: productive_bash },
    Increaser { name: "memory_consult", delta: 4, matcher: memory_consult },
    Increaser { name: "file_read", delta: 1, matcher: file_read },
    Increaser { name: "search_tool", delta: 2, matcher: search_tool },
    Increaser { name: "git_exploration", delta: 2, matcher: git_exploration },
    Increaser { name: "ask_user", delta: 3, matcher: ask_user },
    Increaser { name: "bead_create", delta: 3, matcher: bead_create },
    Increaser { name: "rules_update", delta: 4, matcher: rules_update },
    Increaser { name: "momentum_forward", delta: 3, matcher: momentum_forward },
    // Not farmable: only fires when the user explicitly grants it.
    Increaser { name: "trust_regained", delta: 10, matcher: trust_regained },
];

pub fn find(name: &str) -> Option<&'static Increaser> {
    INCREASERS.iter().find(|i| i.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_required_increasers_present() {
        let names: Vec<&str> = INCREASERS.iter().map(|i| i.name).collect();
        for expected in [
            "tests_passed",
            "build_succeeded",
            "lint_clean",
            "productive_bash",
            "memory_consult",
            "file_read",
            "git_exploration",
            "ask_user",
            "bead_create",
            "rules_update",
            "momentum_forward",
            "trust_regained",
        ] {
            assert!(names.contains(&expected), "missing increaser {expected}");
        }
    }

    #[test]
    fn test_tests_passed_requires_success() {
        let mut ctx = TurnContext::new();
        ctx.is_test_command = true;
        ctx.tool_succeeded = Some(false);
        let state = SessionState::new("s", "p", "/tmp/p");
        assert!(!tests_passed(&ctx, &state));
        ctx.tool_succeeded = Some(true);
        assert!(tests_passed(&ctx, &state));
    }
}
