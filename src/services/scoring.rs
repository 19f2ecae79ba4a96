use std::collections::HashMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Viva answers longer than this many characters earn partial credit.
/// This is a documented placeholder policy, not answer evaluation; a real
/// evaluator can replace `score_viva` as long as scores stay in 0-100.
pub(crate) const VIVA_MIN_ANSWER_CHARS: usize = 20;
pub(crate) const VIVA_CREDIT_RATIO: f64 = 0.7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct McqQuestion {
    pub(crate) id: String,
    pub(crate) prompt: String,
    pub(crate) options: Vec<String>,
    #[serde(alias = "correctAnswer")]
    pub(crate) correct_answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct VivaQuestion {
    pub(crate) id: String,
    pub(crate) prompt: String,
    pub(crate) marks: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScoreOutcome {
    /// Percentage in 0-100.
    pub(crate) score: f64,
    pub(crate) marks_obtained: f64,
}

pub(crate) fn parse_mcq_questions(value: &serde_json::Value) -> anyhow::Result<Vec<McqQuestion>> {
    serde_json::from_value(value.clone()).context("assignment questions are not valid MCQ items")
}

pub(crate) fn parse_viva_questions(value: &serde_json::Value) -> anyhow::Result<Vec<VivaQuestion>> {
    serde_json::from_value(value.clone()).context("assignment questions are not valid viva items")
}

/// Exact-match MCQ scoring: matches / question count, scaled to 0-100.
pub(crate) fn score_mcq(
    questions: &[McqQuestion],
    answers: &HashMap<String, String>,
    max_marks: f64,
) -> ScoreOutcome {
    if questions.is_empty() {
        return ScoreOutcome { score: 0.0, marks_obtained: 0.0 };
    }

    let correct = questions
        .iter()
        .filter(|question| answers.get(&question.id) == Some(&question.correct_answer))
        .count();

    let score = correct as f64 / questions.len() as f64 * 100.0;
    ScoreOutcome { score, marks_obtained: score / 100.0 * max_marks }
}

/// Length-heuristic viva scoring: any transcribed answer longer than
/// `VIVA_MIN_ANSWER_CHARS` earns `VIVA_CREDIT_RATIO` of that question's
/// marks; everything else earns zero.
pub(crate) fn score_viva(
    questions: &[VivaQuestion],
    answers: &HashMap<String, String>,
) -> ScoreOutcome {
    let total_marks: f64 = questions.iter().map(|question| question.marks).sum();
    if total_marks <= 0.0 {
        return ScoreOutcome { score: 0.0, marks_obtained: 0.0 };
    }

    let marks_obtained: f64 = questions
        .iter()
        .map(|question| {
            let answered = answers
                .get(&question.id)
                .map(|answer| answer.chars().count() > VIVA_MIN_ANSWER_CHARS)
                .unwrap_or(false);
            if answered {
                question.marks * VIVA_CREDIT_RATIO
            } else {
                0.0
            }
        })
        .sum();

    let score = (marks_obtained / total_marks * 100.0).clamp(0.0, 100.0);
    ScoreOutcome { score, marks_obtained }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq(id: &str, correct: &str) -> McqQuestion {
        McqQuestion {
            id: id.to_string(),
            prompt: format!("Question {id}"),
            options: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            correct_answer: correct.to_string(),
        }
    }

    fn viva(id: &str, marks: f64) -> VivaQuestion {
        VivaQuestion { id: id.to_string(), prompt: format!("Question {id}"), marks }
    }

    #[test]
    fn mcq_three_of_five_is_sixty_percent() {
        let questions =
            vec![mcq("q1", "a"), mcq("q2", "b"), mcq("q3", "c"), mcq("q4", "a"), mcq("q5", "b")];
        let answers = HashMap::from([
            ("q1".to_string(), "a".to_string()),
            ("q2".to_string(), "b".to_string()),
            ("q3".to_string(), "c".to_string()),
            ("q4".to_string(), "b".to_string()),
            ("q5".to_string(), "c".to_string()),
        ]);

        let outcome = score_mcq(&questions, &answers, 50.0);

        assert_eq!(outcome.score, 60.0);
        assert_eq!(outcome.marks_obtained, 30.0);
    }

    #[test]
    fn mcq_unanswered_questions_count_as_wrong() {
        let questions = vec![mcq("q1", "a"), mcq("q2", "b")];
        let answers = HashMap::from([("q1".to_string(), "a".to_string())]);

        let outcome = score_mcq(&questions, &answers, 100.0);

        assert_eq!(outcome.score, 50.0);
    }

    #[test]
    fn mcq_empty_question_list_scores_zero() {
        let outcome = score_mcq(&[], &HashMap::new(), 100.0);
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.marks_obtained, 0.0);
    }

    #[test]
    fn viva_answer_over_threshold_earns_partial_credit() {
        let questions = vec![viva("q1", 10.0)];
        let answers =
            HashMap::from([("q1".to_string(), "this answer is longer than twenty".to_string())]);

        let outcome = score_viva(&questions, &answers);

        assert_eq!(outcome.marks_obtained, 7.0);
        assert_eq!(outcome.score, 70.0);
    }

    #[test]
    fn viva_answer_at_threshold_earns_nothing() {
        let questions = vec![viva("q1", 10.0)];
        // Exactly 20 characters: not strictly longer, no credit.
        let answer = "a".repeat(VIVA_MIN_ANSWER_CHARS);
        let answers = HashMap::from([("q1".to_string(), answer)]);

        let outcome = score_viva(&questions, &answers);

        assert_eq!(outcome.marks_obtained, 0.0);
        assert_eq!(outcome.score, 0.0);
    }

    #[test]
    fn viva_missing_answer_earns_nothing() {
        let questions = vec![viva("q1", 10.0), viva("q2", 10.0)];
        let answers =
            HashMap::from([("q1".to_string(), "a sufficiently long spoken answer".to_string())]);

        let outcome = score_viva(&questions, &answers);

        assert_eq!(outcome.marks_obtained, 7.0);
        assert_eq!(outcome.score, 35.0);
    }

    #[test]
    fn parse_mcq_accepts_camel_case_alias() {
        let value = serde_json::json!([
            {"id": "q1", "prompt": "p", "options": ["a", "b"], "correctAnswer": "a"}
        ]);

        let questions = parse_mcq_questions(&value).expect("parse");
        assert_eq!(questions[0].correct_answer, "a");
    }
}
