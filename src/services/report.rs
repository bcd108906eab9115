// src/services/report.rs

use crate::{
    models::{
        question::{Dimension, MAX_ANSWER_VALUE, QuestionDefinition, answer_label, dimension_question_count},
        quiz_result::{
            AnsweredQuestion, Category, DetailedReport, DimensionBreakdown, QuizResult,
            QuizResultSummary,
        },
    },
    services::scoring::compute_metrics,
};

/// Summary view of a stored result.
pub fn summarize(battery: &[QuestionDefinition], result: &QuizResult) -> QuizResultSummary {
    QuizResultSummary {
        id: result.id,
        total_score: result.total_score,
        max_score: battery.len() as i32 * MAX_ANSWER_VALUE as i32,
        category: result.category,
        scores: result.scores,
        premium_paid: result.premium_paid,
        created_at: result.created_at,
    }
}

const SCREENING_DISCLAIMER: &str = "This questionnaire is a screening aid, not a diagnosis.";

fn category_guidance(category: Category) -> &'static str {
    match category {
        Category::Low => {
            "Your answers show few of the patterns commonly associated with ADHD. If specific difficulties still affect your daily life, a conversation with a healthcare professional can help."
        }
        Category::Moderate => {
            "Your answers show some patterns commonly associated with ADHD. Consider tracking when these difficulties occur and discussing them with a healthcare professional."
        }
        Category::High => {
            "Your answers show many patterns commonly associated with ADHD. We recommend a full evaluation by a qualified healthcare professional."
        }
    }
}

fn dimension_guidance(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Inattention => {
            "Inattention stands out: external structure such as written task lists, timers and reduced distractions tends to help most."
        }
        Dimension::Hyperactivity => {
            "Hyperactivity stands out: regular movement breaks and tasks that allow physical activity can make long sessions easier."
        }
        Dimension::Impulsivity => {
            "Impulsivity stands out: building in a short pause before responding or deciding can reduce regretted actions."
        }
    }
}

/// Builds the paid detailed report. The caller checks entitlement.
///
/// Scores are recomputed from the stored answers; the stored totals are
/// what the report shows.
pub fn build_report(battery: &[QuestionDefinition], result: &QuizResult) -> DetailedReport {
    let metrics = compute_metrics(battery, &result.answers);

    let dimensions: Vec<DimensionBreakdown> = Dimension::ALL
        .iter()
        .map(|&dimension| DimensionBreakdown {
            dimension,
            score: result.scores.get(dimension),
            max_score: dimension_question_count(battery, dimension) as i32 * MAX_ANSWER_VALUE as i32,
            percentage: metrics.dimension_pct(dimension),
        })
        .collect();

    // Ties keep the earlier dimension.
    let dominant_dimension = dimensions
        .iter()
        .fold(None::<&DimensionBreakdown>, |best, current| match best {
            Some(b) if b.percentage >= current.percentage => Some(b),
            _ => Some(current),
        })
        .map(|d| d.dimension)
        .unwrap_or(Dimension::Inattention);

    let answers = battery
        .iter()
        .filter_map(|q| {
            result.answers.get(&q.id).map(|&value| AnsweredQuestion {
                id: q.id,
                text: q.text,
                dimension: q.dimension,
                value,
                label: answer_label(value),
            })
        })
        .collect();

    let mut guidance = vec![category_guidance(result.category)];
    if result.category != Category::Low {
        guidance.push(dimension_guidance(dominant_dimension));
    }
    guidance.push(SCREENING_DISCLAIMER);

    DetailedReport {
        result_id: result.id,
        category: result.category,
        total_score: result.total_score,
        max_score: metrics.max_score,
        overall_percentage: metrics.overall_pct,
        dimensions,
        dominant_dimension,
        answers,
        guidance,
        created_at: result.created_at,
    }
}
