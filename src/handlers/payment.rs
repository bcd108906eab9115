// src/handlers/payment.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::payment::{ConfirmReportPaymentRequest, CreateReportPaymentRequest},
    services::{entitlement::EntitlementManager, report::summarize},
    state::AppState,
    utils::{json::AppJson, jwt::Claims},
};

/// Opens a checkout for the detailed report of a result.
/// Returns the client secret the browser needs to complete the payment.
pub async fn create_report_payment(
    State(entitlements): State<Arc<EntitlementManager>>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<CreateReportPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let checkout = entitlements
        .create_report_payment(claims.user_id()?, req.quiz_result_id)
        .await?;

    Ok(Json(checkout))
}

/// Confirms a completed payment and unlocks the detailed report.
pub async fn confirm_report_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<ConfirmReportPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let result = state
        .entitlements
        .confirm_report_payment(claims.user_id()?, req.quiz_result_id, &req.payment_intent_id)
        .await?;

    Ok(Json(summarize(state.battery, &result)))
}
