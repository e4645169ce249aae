//! Rock-bottom realignment: forced dialogue entered when confidence
//! reaches the IGNORANCE floor. The session stays read-only until the next
//! prompt carries the realignment marker.

use sentinel_state::SessionState;

use crate::constants::ROCK_BOTTOM_RECOVERY_TARGET;

/// Token the user includes in a prompt to signal they've answered the
/// realignment questions.
pub const REALIGNMENT_MARKER_TOKEN: &str = "REALIGNED:";

pub fn marker_present(prompt: &str) -> bool {
    prompt.contains(REALIGNMENT_MARKER_TOKEN)
}

/// Three to five questions drawn from a fixed template: goal, evidence,
/// next verifiable step.
pub const REALIGNMENT_QUESTIONS: &[&str] = &[
    "What is the concrete goal of this session, in one sentence?",
    "What evidence do you have that your last several actions served that goal?",
    "What is the single next verifiable step, and how will you verify it?",
];

/// The block presented to the user while confidence sits at rock bottom.
pub fn realignment_block() -> String {
    let mut block = String::from(
        "Confidence has hit rock bottom. Before continuing, answer the following and \
         prefix your reply with `REALIGNED:`:\n",
    );
    for (i, question) in REALIGNMENT_QUESTIONS.iter().enumerate() {
        block.push_str(&format!("{}. {}\n", i + 1, question));
    }
    block
}

/// Completes realignment: sets confidence to the (deliberately sub-trusted)
/// recovery target and records the evidence marker the seed scenario
/// expects.
pub fn complete(state: &mut SessionState, turn: u64) {
    let old = state.confidence;
    state.confidence = ROCK_BOTTOM_RECOVERY_TARGET;
    state.push_evidence(
        "rock_bottom_realignment_complete",
        &format!("{old} -> {ROCK_BOTTOM_RECOVERY_TARGET}"),
        turn,
    );
}
