// src/models/quiz_result.rs

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::question::Dimension;

/// Submitted answers keyed by question index.
pub type AnswerSet = BTreeMap<usize, u8>;

/// Final three-way classification of a quiz result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Low,
    Moderate,
    High,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Low => "low",
            Category::Moderate => "moderate",
            Category::High => "high",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Category::Low),
            "moderate" => Ok(Category::Moderate),
            "high" => Ok(Category::High),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}

/// Per-dimension raw scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub inattention: i32,
    pub hyperactivity: i32,
    pub impulsivity: i32,
}

impl DimensionScores {
    pub fn get(&self, dimension: Dimension) -> i32 {
        match dimension {
            Dimension::Inattention => self.inattention,
            Dimension::Hyperactivity => self.hyperactivity,
            Dimension::Impulsivity => self.impulsivity,
        }
    }

    pub fn add(&mut self, dimension: Dimension, value: i32) {
        match dimension {
            Dimension::Inattention => self.inattention += value,
            Dimension::Hyperactivity => self.hyperactivity += value,
            Dimension::Impulsivity => self.impulsivity += value,
        }
    }
}

/// A stored quiz submission.
///
/// Immutable after creation except for `premium_paid` and `payment_id`,
/// which the payment confirmation flow sets exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResult {
    pub id: i64,
    pub user_id: i64,
    pub total_score: i32,
    pub scores: DimensionScores,
    pub category: Category,
    pub answers: AnswerSet,
    pub premium_paid: bool,
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Candidate handed to the store before an id is assigned.
#[derive(Debug, Clone)]
pub struct NewQuizResult {
    pub user_id: i64,
    pub total_score: i32,
    pub scores: DimensionScores,
    pub category: Category,
    pub answers: AnswerSet,
    pub created_at: Option<DateTime<Utc>>,
}

/// DTO for submitting a completed questionnaire.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    /// Key: question index. Value: 0 (Never) ..= 3 (Always).
    pub answers: AnswerSet,
}

/// Public view of a result; the raw answers are only part of the paid report.
#[derive(Debug, Serialize)]
pub struct QuizResultSummary {
    pub id: i64,
    pub total_score: i32,
    pub max_score: i32,
    pub category: Category,
    pub scores: DimensionScores,
    pub premium_paid: bool,
    pub created_at: DateTime<Utc>,
}

/// Score, maximum and percentage for one dimension of the report.
#[derive(Debug, Serialize)]
pub struct DimensionBreakdown {
    pub dimension: Dimension,
    pub score: i32,
    pub max_score: i32,
    pub percentage: f64,
}

/// A single answered question in the report.
#[derive(Debug, Serialize)]
pub struct AnsweredQuestion {
    pub id: usize,
    pub text: &'static str,
    pub dimension: Dimension,
    pub value: u8,
    pub label: &'static str,
}

/// Paid detailed report for one result.
#[derive(Debug, Serialize)]
pub struct DetailedReport {
    pub result_id: i64,
    pub category: Category,
    pub total_score: i32,
    pub max_score: i32,
    pub overall_percentage: f64,
    pub dimensions: Vec<DimensionBreakdown>,
    pub dominant_dimension: Dimension,
    pub answers: Vec<AnsweredQuestion>,
    pub guidance: Vec<&'static str>,
    pub created_at: DateTime<Utc>,
}
