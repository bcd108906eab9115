// src/handlers/subscription.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::{
    error::AppError,
    models::subscription::StartSubscriptionRequest,
    services::entitlement::EntitlementManager,
    utils::{json::AppJson, jwt::Claims},
};

/// Current premium status: latest subscription, access flag and live grants.
pub async fn get_subscription(
    State(entitlements): State<Arc<EntitlementManager>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let overview = entitlements
        .overview(claims.user_id()?, Utc::now())
        .await?;

    Ok(Json(overview))
}

/// Starts a monthly or yearly plan.
pub async fn start_subscription(
    State(entitlements): State<Arc<EntitlementManager>>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<StartSubscriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let started = entitlements
        .start_subscription(claims.user_id()?, req.plan, Utc::now())
        .await?;

    Ok((StatusCode::CREATED, Json(started)))
}

/// Cancels renewal. Premium features stay available until the period ends.
pub async fn cancel_subscription(
    State(entitlements): State<Arc<EntitlementManager>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let canceled = entitlements
        .cancel_subscription(claims.user_id()?, id, Utc::now())
        .await?;

    Ok(Json(canceled))
}

/// Refreshes the latest subscription from the payment provider.
pub async fn sync_subscription(
    State(entitlements): State<Arc<EntitlementManager>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let synced = entitlements
        .sync_subscription(claims.user_id()?, Utc::now())
        .await?;

    Ok(Json(synced))
}
