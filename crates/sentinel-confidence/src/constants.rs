//! Tunables for the confidence pipeline. Kept in one place so the
//! engine, streak/diminishing logic, and realignment flow agree on numbers.

/// Starting confidence for a freshly created session.
pub const DEFAULT_CONFIDENCE: i32 = 70;

/// At or below this, the session enters forced realignment.
pub const THRESHOLD_ROCK_BOTTOM: i32 = 10;

/// Below this, external consultation is mandatory before non-trivial writes.
pub const THRESHOLD_MANDATORY_EXTERNAL: i32 = 30;

/// Below this, research is required before touching an unfamiliar library.
pub const THRESHOLD_REQUIRE_RESEARCH: i32 = 50;

/// Below this, production writes are denied.
pub const THRESHOLD_PRODUCTION_ACCESS: i32 = 51;

/// Confidence set on realignment completion. Deliberately sub-trusted so
/// rock bottom can't be gamed back to full trust in one step.
pub const ROCK_BOTTOM_RECOVERY_TARGET: i32 = 65;

/// Per-turn clip for ordinary deltas.
pub const MAX_CONFIDENCE_DELTA_PER_TURN: i32 = 15;

/// Wider clip that applies when the net delta is positive and the tier is
/// IGNORANCE or HYPOTHESIS (recovery is allowed to move faster than decay).
pub const MAX_CONFIDENCE_RECOVERY_DELTA: i32 = 30;

/// Mean reversion's attractor on idle turns.
pub const MEAN_REVERSION_TARGET: i32 = 75;

/// Fraction of the gap to `MEAN_REVERSION_TARGET` closed per idle turn.
pub const MEAN_REVERSION_RATE: f64 = 0.02;

/// Streak length -> multiplier applied to the turn's next positive delta.
pub const STREAK_MULTIPLIERS: &[(u32, f64)] = &[(2, 1.25), (3, 1.5), (5, 2.0)];

/// Signal names subject to diminishing returns within the rolling window.
pub const FARMABLE_INCREASERS: &[&str] = &["file_read", "productive_bash", "search_tool"];

/// Occurrence count within the window -> multiplier. Index 0 is unused
/// (counts start at 1); anything at or beyond `DIMINISHING_CAP` is zero.
pub const DIMINISHING_MULTIPLIERS: &[(u32, f64)] =
    &[(1, 1.0), (2, 0.75), (3, 0.5), (4, 0.25)];

/// Occurrence count at or beyond which a farmable increaser yields nothing.
pub const DIMINISHING_CAP: u32 = 5;

/// Adaptive cooldown dampening: multiplier per false-positive count, capped.
pub const FP_COOLDOWN_STRETCH_PER_COUNT: f64 = 0.5;
pub const FP_COOLDOWN_STRETCH_CAP: f64 = 4.0;

/// Sunk-cost reducer: same file edited at least this many times with no
/// intervening test run trips the reducer.
pub const SUNK_COST_EDIT_THRESHOLD: u32 = 3;

/// Goal-drift reducer: keyword overlap ratio below this trips the reducer,
/// but only once at least this many turns have passed since the goal was set.
pub const GOAL_DRIFT_OVERLAP_THRESHOLD: f64 = 0.10;
pub const GOAL_DRIFT_MIN_TURNS: u32 = 5;

/// Large-diff reducer: a changed-line count at or above this trips the
/// reducer.
pub const LARGE_DIFF_LINE_THRESHOLD: u32 = 300;

/// oracle_gate: number of consecutive failures on related subjects before
/// further edits require an external-consult tool.
pub const ORACLE_GATE_FAILURE_THRESHOLD: u32 = 2;
