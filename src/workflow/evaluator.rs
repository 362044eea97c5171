use serde::{Deserialize, Serialize};

use super::phase::{MessageRole, WorkflowPhase};

/// Minimum distinct user turns in the current phase before it can complete.
const MIN_USER_TURNS: usize = 3;
/// Minimum total user words in the current phase before it can complete.
const MIN_USER_WORDS: usize = 150;
/// Overall score a phase must reach before READY_TO_ADVANCE is suggested.
const READY_THRESHOLD: u8 = 70;
/// Epic content length treated as fully sufficient context.
const EPIC_FULL_CONTEXT_WORDS: usize = 50;

const WEIGHT_ENGAGEMENT: f64 = 0.4;
const WEIGHT_DEPTH: f64 = 0.4;
const WEIGHT_CONTEXT: f64 = 0.2;

/// Per-dimension completeness percentages, all clamped into [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completeness {
    /// How much seed material the epic content provides.
    pub context: u8,
    /// Distinct user turns relative to the phase minimum.
    pub engagement: u8,
    /// User word volume relative to the phase minimum.
    pub depth: u8,
    pub overall_score: u8,
}

impl Completeness {
    pub fn zero() -> Self {
        Self {
            context: 0,
            engagement: 0,
            depth: 0,
            overall_score: 0,
        }
    }

    pub fn full() -> Self {
        Self {
            context: 100,
            engagement: 100,
            depth: 100,
            overall_score: 100,
        }
    }
}

/// The slice of a message the evaluator needs.
#[derive(Debug, Clone)]
pub struct EvaluatedMessage {
    pub role: MessageRole,
    pub word_count: usize,
}

impl EvaluatedMessage {
    pub fn new(role: MessageRole, content: &str) -> Self {
        Self {
            role,
            word_count: count_words(content),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub completeness: Completeness,
    pub phase_complete: bool,
}

/// Score the current phase from its message slice and the workflow's epic
/// content. Pure and idempotent; callers persist the result.
pub fn evaluate(
    phase: WorkflowPhase,
    epic_content: &str,
    messages: &[EvaluatedMessage],
) -> Evaluation {
    if phase.is_terminal() {
        return Evaluation {
            completeness: Completeness::full(),
            phase_complete: true,
        };
    }

    let user_turns = messages
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .count();
    let user_words: usize = messages
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .map(|m| m.word_count)
        .sum();

    let context = ratio_pct(count_words(epic_content), EPIC_FULL_CONTEXT_WORDS);
    let engagement = ratio_pct(user_turns, MIN_USER_TURNS);
    let depth = ratio_pct(user_words, MIN_USER_WORDS);

    // Nothing from the user yet means nothing is complete, regardless of how
    // rich the epic content is.
    let overall_score = if user_turns == 0 {
        0
    } else {
        let weighted = f64::from(engagement) * WEIGHT_ENGAGEMENT
            + f64::from(depth) * WEIGHT_DEPTH
            + f64::from(context) * WEIGHT_CONTEXT;
        weighted.round().clamp(0.0, 100.0) as u8
    };

    let phase_complete = user_turns >= MIN_USER_TURNS
        && user_words >= MIN_USER_WORDS
        && overall_score >= READY_THRESHOLD;

    Evaluation {
        completeness: Completeness {
            context,
            engagement,
            depth,
            overall_score,
        },
        phase_complete,
    }
}

fn ratio_pct(have: usize, need: usize) -> u8 {
    if need == 0 {
        return 100;
    }
    let pct = (have as f64 / need as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(words: usize) -> EvaluatedMessage {
        EvaluatedMessage {
            role: MessageRole::User,
            word_count: words,
        }
    }

    fn assistant(words: usize) -> EvaluatedMessage {
        EvaluatedMessage {
            role: MessageRole::Assistant,
            word_count: words,
        }
    }

    #[test]
    fn zero_user_turns_scores_zero_overall() {
        let result = evaluate(WorkflowPhase::Analysis, "a ten word epic seed text for the new feature", &[]);
        assert_eq!(result.completeness.overall_score, 0);
        assert!(!result.phase_complete);

        // Assistant-only logs count as zero user turns too.
        let result = evaluate(
            WorkflowPhase::Analysis,
            "seed",
            &[assistant(40), assistant(60)],
        );
        assert_eq!(result.completeness.overall_score, 0);
        assert!(!result.phase_complete);
    }

    #[test]
    fn all_dimensions_stay_within_bounds() {
        let huge: Vec<EvaluatedMessage> = (0..200).map(|_| user(500)).collect();
        let epic = "word ".repeat(10_000);
        let result = evaluate(WorkflowPhase::Strategy, &epic, &huge);
        let c = result.completeness;
        for dim in [c.context, c.engagement, c.depth, c.overall_score] {
            assert!(dim <= 100);
        }
    }

    #[test]
    fn evaluation_is_idempotent() {
        let log = vec![user(30), assistant(80), user(45)];
        let first = evaluate(WorkflowPhase::Analysis, "epic seed content here", &log);
        let second = evaluate(WorkflowPhase::Analysis, "epic seed content here", &log);
        assert_eq!(first, second);
    }

    #[test]
    fn short_epic_with_no_turns_scores_low() {
        let epic = "login page must support password reset via email link now";
        assert_eq!(count_words(epic), 10);
        let result = evaluate(WorkflowPhase::Analysis, epic, &[]);
        assert!(result.completeness.overall_score < 20);
        assert!(!result.phase_complete);
    }

    #[test]
    fn three_substantial_turns_cross_the_threshold() {
        let log = vec![
            user(60),
            assistant(120),
            user(55),
            assistant(90),
            user(50),
        ];
        let result = evaluate(WorkflowPhase::Analysis, "short epic", &log);
        assert!(result.completeness.overall_score >= READY_THRESHOLD);
        assert!(result.phase_complete);
    }

    #[test]
    fn many_turns_with_too_few_words_do_not_complete() {
        let log = vec![user(10), user(10), user(10), user(10)];
        let result = evaluate(WorkflowPhase::Analysis, "seed", &log);
        assert!(!result.phase_complete);
        assert!(result.completeness.depth < 100);
    }

    #[test]
    fn one_giant_turn_is_not_enough_engagement() {
        let log = vec![user(1_000)];
        let result = evaluate(WorkflowPhase::TestPlanning, "seed", &log);
        assert!(!result.phase_complete);
    }

    #[test]
    fn terminal_phase_is_always_complete() {
        let result = evaluate(WorkflowPhase::Completed, "", &[]);
        assert!(result.phase_complete);
        assert_eq!(result.completeness.overall_score, 100);
    }

    #[test]
    fn word_counting_ignores_whitespace_runs() {
        assert_eq!(count_words("  one\ttwo \n three  "), 3);
        assert_eq!(count_words(""), 0);
    }
}
