// src/handlers/premium.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;

use crate::{error::AppError, services::entitlement::EntitlementManager, utils::jwt::Claims};

/// Checks access to one named premium feature.
/// 200 with the grant while it is valid, 402 otherwise.
pub async fn get_feature(
    State(entitlements): State<Arc<EntitlementManager>>,
    Extension(claims): Extension<Claims>,
    Path(feature): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let grant = entitlements
        .feature_grant(claims.user_id()?, &feature, Utc::now())
        .await?;

    Ok(Json(grant))
}
