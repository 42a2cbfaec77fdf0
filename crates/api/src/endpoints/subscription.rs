//! Subscription and captain endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use profile_common::AppResult;
use profile_core::{SubscriptionInfo, SubscriptionUpdate};
use serde::Deserialize;

use crate::{extractors::AuthPrincipal, middleware::AppState, response::ApiResponse};

/// Captain status request.
#[derive(Debug, Deserialize)]
pub struct CaptainRequest {
    pub is_captain: bool,
}

async fn get_subscription(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<SubscriptionInfo>> {
    let info = state
        .subscription_service
        .get_subscription(&principal.user_id)
        .await?;
    Ok(ApiResponse::ok(info))
}

/// Admin only.
async fn update_subscription(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<SubscriptionUpdate>,
) -> AppResult<ApiResponse<SubscriptionInfo>> {
    let info = state
        .subscription_service
        .update_subscription(&principal, &user_id, req)
        .await?;
    Ok(ApiResponse::ok(info))
}

/// Admin only.
async fn set_captain(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<CaptainRequest>,
) -> AppResult<ApiResponse<SubscriptionInfo>> {
    let info = state
        .subscription_service
        .set_captain_status(&principal, &user_id, req.is_captain)
        .await?;
    Ok(ApiResponse::ok(info))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me/subscription", get(get_subscription))
        .route("/{user_id}/subscription", put(update_subscription))
        .route("/{user_id}/captain", put(set_captain))
}
