//! The confidence pipeline: decay, reducers, increasers, streak and
//! diminishing-returns adjustment, rate limiting, mean reversion, and final
//! bounds enforcement, applied once per event.

use chrono::{DateTime, Utc};
use sentinel_core::Tier;
use sentinel_lock::cooldown::CooldownStore;
use sentinel_state::SessionState;

use crate::constants::{
    MAX_CONFIDENCE_DELTA_PER_TURN, MAX_CONFIDENCE_RECOVERY_DELTA, MEAN_REVERSION_RATE,
    MEAN_REVERSION_TARGET, THRESHOLD_ROCK_BOTTOM,
};
use crate::context::TurnContext;
use crate::dispute;
use crate::increasers::INCREASERS;
use crate::reducers::REDUCERS;
use crate::streaks::{self, TrajectoryWarning};
use crate::tool_debt;

#[derive(Debug, Clone, Default)]
pub struct EngineOutcome {
    pub old_confidence: i32,
    pub new_confidence: i32,
    pub applied_delta: i32,
    pub clipped: bool,
    pub fired_reducers: Vec<String>,
    pub fired_increasers: Vec<String>,
    pub entered_rock_bottom: bool,
    pub trajectory_warning: Option<TrajectoryWarning>,
}

fn reducer_key(name: &str, subkey: &Option<String>) -> String {
    match subkey {
        Some(s) => format!("reducer:{name}:{s}"),
        None => format!("reducer:{name}"),
    }
}

/// Runs the full pipeline for one event and mutates `state` in place.
pub fn apply_turn(
    state: &mut SessionState,
    cooldowns: &mut CooldownStore,
    ctx: &TurnContext,
    turn: u64,
    now: DateTime<Utc>,
) -> EngineOutcome {
    let old_confidence = state.confidence;
    let tier_before = Tier::from_confidence(old_confidence);

    // --- decay: tool-debt accrual/recovery ---
    let debt_before: f64 = state.tool_debt.values().sum();
    let debt_after = tool_debt::tick(&mut state.tool_debt, &ctx.debt_families_used);
    let debt_delta = tool_debt::debt_reducer_delta(debt_after);
    let debt_recovery_delta = if !ctx.debt_families_used.is_empty() && debt_before > debt_after {
        -debt_delta // companion increaser cancels the pressure this turn
    } else {
        0
    };

    // --- reducers ---
    let mut reducer_sum = debt_delta + debt_recovery_delta;
    let mut fired_reducers = Vec::new();
    for reducer in REDUCERS {
        let subkey = (reducer.subkey)(ctx);
        let key = reducer_key(reducer.name, &subkey);
        if cooldowns.is_on_cooldown(&key, now) {
            continue;
        }
        if !(reducer.matcher)(ctx, state) {
            continue;
        }

        reducer_sum += reducer.delta;
        fired_reducers.push(reducer.name.to_string());
        *state.reducer_triggers.entry(reducer.name.to_string()).or_insert(0) += 1;
        state.push_evidence(
            "reducer_fired",
            &format!("{}: {}", reducer.name, reducer.delta),
            turn,
        );

        let fp_count = state.reducer_fp_counts.get(reducer.name).copied().unwrap_or(0);
        let stretch = dispute::cooldown_stretch(fp_count);
        cooldowns.set_cooldown(
            &key,
            std::time::Duration::from_secs((reducer.cooldown_seconds as f64 * stretch) as u64),
            now,
        );
    }

    // --- disputes: resolved as part of the same turn they're raised in ---
    if let Some(target) = &ctx.dispute_target {
        if let Some(restore) = dispute::apply(state, target, turn) {
            reducer_sum += restore;
            // Stretches the no-subkey cooldown slot. Reducers that key their
            // cooldown by subkey (sunk_cost, edit_oscillation, cascade_block,
            // hook_block) get their dampening applied against whichever
            // subkey they next fire under, since the dispute doesn't carry
            // the original firing's subkey forward.
            if let Some(r) = crate::reducers::find(target) {
                cooldowns.stretch(&reducer_key(r.name, &None), dispute::cooldown_stretch(1));
            }
        }
    }

    // --- increasers, with diminishing returns folded in per occurrence ---
    let mut raw_increaser_sum = 0i32;
    let mut fired_increasers = Vec::new();
    for increaser in INCREASERS {
        if !(increaser.matcher)(ctx, state) {
            continue;
        }
        let multiplier = if streaks::is_farmable(increaser.name) {
            streaks::record_farmable_occurrence(&mut state.diminishing_counters, increaser.name)
        } else {
            1.0
        };
        let contribution = (increaser.delta as f64 * multiplier).round() as i32;
        raw_increaser_sum += contribution;
        if contribution != 0 {
            fired_increasers.push(increaser.name.to_string());
            *state.increaser_triggers.entry(increaser.name.to_string()).or_insert(0) += 1;
        }
    }

    // --- streak: multiplies the turn's aggregate positive increaser delta ---
    let reducer_fired_this_turn = !fired_reducers.is_empty();
    let mut increaser_sum = raw_increaser_sum;
    if reducer_fired_this_turn {
        state.streak = 0;
    } else if raw_increaser_sum > 0 {
        let multiplier = streaks::streak_multiplier(state.streak);
        increaser_sum = (raw_increaser_sum as f64 * multiplier).round() as i32;
        state.streak += 1;
    }

    let nothing_fired = reducer_sum == 0 && raw_increaser_sum == 0;
    let mut total_delta = reducer_sum + increaser_sum;
    let mut clipped = false;

    if nothing_fired {
        // --- mean reversion: idle turns drift toward the stasis floor ---
        let gap = (MEAN_REVERSION_TARGET - old_confidence) as f64;
        total_delta = (gap * MEAN_REVERSION_RATE).trunc() as i32;
    } else {
        // --- rate limit ---
        let ceiling = if total_delta > 0 && matches!(tier_before, Tier::Ignorance | Tier::Hypothesis) {
            MAX_CONFIDENCE_RECOVERY_DELTA
        } else {
            MAX_CONFIDENCE_DELTA_PER_TURN
        };
        let clamped = total_delta.clamp(-MAX_CONFIDENCE_DELTA_PER_TURN, ceiling);
        if clamped != total_delta {
            clipped = true;
            state.push_evidence(
                "confidence_delta_clipped",
                &format!("{total_delta} -> {clamped}"),
                turn,
            );
        }
        total_delta = clamped;
    }

    // --- bounds ---
    state.confidence = (old_confidence + total_delta).clamp(0, 100);
    let tier_after = Tier::from_confidence(state.confidence);

    let entered_rock_bottom =
        old_confidence > THRESHOLD_ROCK_BOTTOM && state.confidence <= THRESHOLD_ROCK_BOTTOM;

    state.push_evidence(
        "confidence_change",
        &format!("{old_confidence} -> {} ({tier_before} -> {tier_after})", state.confidence),
        turn,
    );

    EngineOutcome {
        old_confidence,
        new_confidence: state.confidence,
        applied_delta: total_delta,
        clipped,
        fired_reducers,
        fired_increasers,
        entered_rock_bottom,
        trajectory_warning: None,
    }
}
