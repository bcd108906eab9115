// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{
        question::QuestionnaireResponse,
        quiz_result::{NewQuizResult, QuizResultSummary, SubmitQuizRequest},
    },
    services::{
        report::{build_report, summarize},
        scoring::score_answers,
    },
    state::AppState,
    utils::{json::AppJson, jwt::Claims},
};

/// Returns the question battery and the answer scale.
pub async fn get_questions(State(state): State<AppState>) -> impl IntoResponse {
    Json(QuestionnaireResponse::from_battery(state.battery))
}

/// Submits a completed questionnaire.
///
/// * Rejects incomplete or malformed answer sets before scoring.
/// * Scores and classifies the answers.
/// * Stores the result together with the raw answers.
pub async fn submit_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let card = score_answers(state.battery, &req.answers).map_err(|e| {
        tracing::info!("Rejected quiz submission from user {}: {}", user_id, e);
        AppError::from(e)
    })?;

    let result = state
        .store
        .save_quiz_result(NewQuizResult {
            user_id,
            total_score: card.metrics.total_score,
            scores: card.metrics.scores,
            category: card.category,
            answers: req.answers,
            created_at: None,
        })
        .await?;

    tracing::info!(
        "Stored quiz result {} for user {}: {} ({}/{})",
        result.id,
        user_id,
        result.category,
        result.total_score,
        card.metrics.max_score
    );

    Ok((StatusCode::CREATED, Json(summarize(state.battery, &result))))
}

/// Lists the caller's results, newest first.
pub async fn list_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let results: Vec<QuizResultSummary> = state
        .store
        .list_quiz_results(user_id)
        .await?
        .iter()
        .map(|r| summarize(state.battery, r))
        .collect();

    Ok(Json(results))
}

/// Summary of one result owned by the caller.
pub async fn get_result(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .entitlements
        .owned_result(claims.user_id()?, id)
        .await?;

    Ok(Json(summarize(state.battery, &result)))
}

/// Detailed report. Returns 402 until the report has been paid for.
pub async fn get_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .entitlements
        .paid_result(claims.user_id()?, id)
        .await?;

    Ok(Json(build_report(state.battery, &result)))
}
