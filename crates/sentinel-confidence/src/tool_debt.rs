//! Tool-debt families: a pressure-to-remember mechanism. Debt accrues
//! per turn a family goes unused and is partially forgiven when it's used.
//!
//! Grounded on `_confidence_tool_debt.py`'s seven debt families: it used
//! the same accrue/recover/cap shape but only shipped its module docstring
//! in the retrieved source, so the per-family rates below are this crate's
//! own tuning.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtFamily {
    PalConsultation,
    SerenaSemantic,
    Beads,
    AgentDelegation,
    Skills,
    Clarification,
    TechDebtCleanup,
}

impl DebtFamily {
    pub const ALL: [DebtFamily; 7] = [
        DebtFamily::PalConsultation,
        DebtFamily::SerenaSemantic,
        DebtFamily::Beads,
        DebtFamily::AgentDelegation,
        DebtFamily::Skills,
        DebtFamily::Clarification,
        DebtFamily::TechDebtCleanup,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DebtFamily::PalConsultation => "pal_consultation",
            DebtFamily::SerenaSemantic => "serena_semantic",
            DebtFamily::Beads => "beads",
            DebtFamily::AgentDelegation => "agent_delegation",
            DebtFamily::Skills => "skills",
            DebtFamily::Clarification => "clarification",
            DebtFamily::TechDebtCleanup => "tech_debt_cleanup",
        }
    }

    /// Debt accrued per turn the family goes unused.
    fn accrual_rate(self) -> f64 {
        match self {
            DebtFamily::PalConsultation => 0.5,
            DebtFamily::SerenaSemantic => 0.4,
            DebtFamily::Beads => 0.6,
            DebtFamily::AgentDelegation => 0.3,
            DebtFamily::Skills => 0.3,
            DebtFamily::Clarification => 0.4,
            DebtFamily::TechDebtCleanup => 0.3,
        }
    }

    /// Ceiling on accumulated debt for this family.
    fn cap(self) -> f64 {
        10.0
    }

    /// Fraction of accumulated debt forgiven when the family is used.
    fn recovery_fraction(self) -> f64 {
        0.75
    }
}

/// Advances every family's debt by one turn: families in `used` recover,
/// the rest accrue. Returns the total debt across all families after the
/// update, for the reducer to scale against.
pub fn tick(debt: &mut HashMap<String, f64>, used: &[DebtFamily]) -> f64 {
    for family in DebtFamily::ALL {
        let key = family.as_str().to_string();
        let current = *debt.get(&key).unwrap_or(&0.0);
        let updated = if used.contains(&family) {
            current * (1.0 - family.recovery_fraction())
        } else {
            (current + family.accrual_rate()).min(family.cap())
        };
        debt.insert(key, updated);
    }
    debt.values().sum()
}

/// Debt-to-confidence scale: how much of the total accumulated debt is
/// expressed as a reducer delta each turn.
pub const DEBT_REDUCER_SCALE: f64 = 0.3;

pub fn debt_reducer_delta(total_debt: f64) -> i32 {
    -((total_debt * DEBT_REDUCER_SCALE).round() as i32)
}
