use std::collections::BTreeMap;

use uuid::Uuid;

use crate::models::question::{AnswerOption, Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreOutcome {
    pub correct_count: usize,
    pub score_percent: i32,
    pub passed: bool,
}

pub struct ScoringService;

impl ScoringService {
    /// Scores a validated answer set against the question list. Callers are
    /// responsible for rejecting empty question sets and answer-count
    /// mismatches before this runs; an unparseable selection simply does not
    /// match and counts as incorrect.
    pub fn score(
        questions: &[Question],
        answers: &BTreeMap<Uuid, String>,
        passing_score: i32,
    ) -> ScoreOutcome {
        debug_assert!(!questions.is_empty());

        let correct_count = questions
            .iter()
            .filter(|question| {
                answers
                    .get(&question.id)
                    .and_then(|raw| AnswerOption::parse_selection(raw))
                    == Some(question.correct_answer)
            })
            .count();

        let score_percent = percent_rounded(correct_count, questions.len());
        ScoreOutcome {
            correct_count,
            score_percent,
            passed: score_percent >= passing_score,
        }
    }
}

/// Integer percentage with round-half-up, computed without floats.
fn percent_rounded(correct: usize, total: usize) -> i32 {
    ((correct * 200 + total) / (2 * total)) as i32
}
