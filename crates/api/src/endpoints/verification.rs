//! Verification counter endpoints. Users read their own metrics; everything
//! else is for moderators.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use profile_common::AppResult;
use profile_core::{ActivityCounterDelta, VerificationMetrics};

use crate::{extractors::AuthPrincipal, middleware::AppState, response::ApiResponse};

async fn get_own_metrics(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<VerificationMetrics>> {
    let metrics = state
        .verification_service
        .get_own_metrics(&principal.user_id)
        .await?;
    Ok(ApiResponse::ok(metrics))
}

async fn get_metrics(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<VerificationMetrics>> {
    let metrics = state
        .verification_service
        .get_metrics(&principal, &user_id)
        .await?;
    Ok(ApiResponse::ok(metrics))
}

async fn increment_verification(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<VerificationMetrics>> {
    let metrics = state
        .verification_service
        .increment_verification(&principal, &user_id)
        .await?;
    Ok(ApiResponse::ok(metrics))
}

async fn increment_no_show(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<VerificationMetrics>> {
    let metrics = state
        .verification_service
        .increment_no_show(&principal, &user_id)
        .await?;
    Ok(ApiResponse::ok(metrics))
}

async fn update_activity_counters(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<ActivityCounterDelta>,
) -> AppResult<ApiResponse<VerificationMetrics>> {
    let metrics = state
        .verification_service
        .update_activity_counters(&principal, &user_id, req)
        .await?;
    Ok(ApiResponse::ok(metrics))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me/verification", get(get_own_metrics))
        .route(
            "/{user_id}/verification",
            get(get_metrics).post(increment_verification),
        )
        .route("/{user_id}/no-shows", post(increment_no_show))
        .route("/{user_id}/activity-counters", post(update_activity_counters))
}
