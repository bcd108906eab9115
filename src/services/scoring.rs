// src/services/scoring.rs

//! Quiz scoring and categorization.
//!
//! Pure functions only: validation of an answer set against the battery,
//! per-dimension scoring, and the ordered classification rule table.

use std::fmt;

use crate::{
    error::AppError,
    models::{
        question::{Dimension, MAX_ANSWER_VALUE, QuestionDefinition, dimension_question_count},
        quiz_result::{AnswerSet, Category, DimensionScores},
    },
};

/// Rejection reasons for a submitted answer set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizError {
    /// Some questions of the battery were not answered.
    Incomplete { missing: Vec<usize> },
    /// An answer references a question that is not part of the battery.
    UnknownQuestion(usize),
    /// An answer value outside of 0..=3.
    InvalidAnswer { question: usize, value: u8 },
}

impl fmt::Display for QuizError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizError::Incomplete { missing } => {
                write!(f, "Quiz incomplete: {} unanswered question(s)", missing.len())
            }
            QuizError::UnknownQuestion(id) => write!(f, "Unknown question index {}", id),
            QuizError::InvalidAnswer { question, value } => write!(
                f,
                "Invalid answer {} for question {} (expected 0..={})",
                value, question, MAX_ANSWER_VALUE
            ),
        }
    }
}

impl std::error::Error for QuizError {}

impl From<QuizError> for AppError {
    fn from(err: QuizError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Intermediate numbers the classification rules look at.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMetrics {
    pub total_score: i32,
    pub max_score: i32,
    pub scores: DimensionScores,
    pub inattention_pct: f64,
    pub hyperactivity_pct: f64,
    pub impulsivity_pct: f64,
    pub overall_pct: f64,
    /// Share of answers at the maximum value.
    pub high_answer_fraction: f64,
}

impl ScoreMetrics {
    pub fn dimension_pct(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Inattention => self.inattention_pct,
            Dimension::Hyperactivity => self.hyperactivity_pct,
            Dimension::Impulsivity => self.impulsivity_pct,
        }
    }

    fn dimension_pcts(&self) -> [f64; 3] {
        [self.inattention_pct, self.hyperactivity_pct, self.impulsivity_pct]
    }
}

/// Metrics plus the resulting category.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    pub metrics: ScoreMetrics,
    pub category: Category,
}

/// A classification rule: predicate and the category it assigns.
pub type ClassificationRule = (fn(&ScoreMetrics) -> bool, Category);

/// Evaluated top to bottom, first match wins. Falls through to `Low`.
pub const CLASSIFICATION_RULES: [ClassificationRule; 5] = [
    (mostly_max_answers, Category::High),
    (any_dimension_severe, Category::High),
    (two_dimensions_elevated, Category::High),
    (overall_elevated, Category::High),
    (moderate_signal, Category::Moderate),
];

fn mostly_max_answers(m: &ScoreMetrics) -> bool {
    m.high_answer_fraction >= 0.65
}

fn any_dimension_severe(m: &ScoreMetrics) -> bool {
    m.dimension_pcts().iter().any(|pct| *pct >= 70.0)
}

fn two_dimensions_elevated(m: &ScoreMetrics) -> bool {
    m.dimension_pcts().iter().filter(|pct| **pct >= 60.0).count() >= 2
}

fn overall_elevated(m: &ScoreMetrics) -> bool {
    m.overall_pct >= 60.0
}

fn moderate_signal(m: &ScoreMetrics) -> bool {
    m.dimension_pcts().iter().any(|pct| *pct >= 45.0) || m.overall_pct >= 35.0
}

/// Applies [`CLASSIFICATION_RULES`] in order.
pub fn classify(metrics: &ScoreMetrics) -> Category {
    CLASSIFICATION_RULES
        .iter()
        .find(|(applies, _)| applies(metrics))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Low)
}

/// Checks that every question of the battery has exactly one in-range answer.
pub fn validate_answers(
    battery: &[QuestionDefinition],
    answers: &AnswerSet,
) -> Result<(), QuizError> {
    let missing: Vec<usize> = battery
        .iter()
        .map(|q| q.id)
        .filter(|id| !answers.contains_key(id))
        .collect();
    if !missing.is_empty() {
        return Err(QuizError::Incomplete { missing });
    }

    for (&question, &value) in answers {
        if !battery.iter().any(|q| q.id == question) {
            return Err(QuizError::UnknownQuestion(question));
        }
        if value > MAX_ANSWER_VALUE {
            return Err(QuizError::InvalidAnswer { question, value });
        }
    }

    Ok(())
}

fn percentage(score: i32, question_count: usize) -> f64 {
    if question_count == 0 {
        return 0.0;
    }
    score as f64 / (question_count as f64 * MAX_ANSWER_VALUE as f64) * 100.0
}

/// Computes the metrics of an already validated answer set.
pub fn compute_metrics(battery: &[QuestionDefinition], answers: &AnswerSet) -> ScoreMetrics {
    let mut scores = DimensionScores::default();
    let mut total_score = 0;
    let mut max_answers = 0usize;

    for question in battery {
        if let Some(&value) = answers.get(&question.id) {
            total_score += value as i32;
            scores.add(question.dimension, value as i32);
            if value == MAX_ANSWER_VALUE {
                max_answers += 1;
            }
        }
    }

    let answered = answers.len();
    let high_answer_fraction = if answered == 0 {
        0.0
    } else {
        max_answers as f64 / answered as f64
    };

    let pct = |dimension: Dimension| {
        percentage(
            scores.get(dimension),
            dimension_question_count(battery, dimension),
        )
    };

    ScoreMetrics {
        total_score,
        max_score: battery.len() as i32 * MAX_ANSWER_VALUE as i32,
        scores,
        inattention_pct: pct(Dimension::Inattention),
        hyperactivity_pct: pct(Dimension::Hyperactivity),
        impulsivity_pct: pct(Dimension::Impulsivity),
        overall_pct: percentage(total_score, battery.len()),
        high_answer_fraction,
    }
}

/// Validates, scores and classifies an answer set.
pub fn score_answers(
    battery: &[QuestionDefinition],
    answers: &AnswerSet,
) -> Result<ScoreCard, QuizError> {
    validate_answers(battery, answers)?;
    let metrics = compute_metrics(battery, answers);
    let category = classify(&metrics);
    Ok(ScoreCard { metrics, category })
}
