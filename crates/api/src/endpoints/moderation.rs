//! Moderation endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use profile_common::AppResult;
use profile_core::{BanInput, BanOutcome, PendingPhoto, PhotoDecision, PhotoModerationOutcome};
use serde::Deserialize;

use crate::{extractors::AuthPrincipal, middleware::AppState, response::ApiResponse};

/// Pagination for the review queue.
#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    50
}

/// Photo decision request.
#[derive(Debug, Deserialize)]
pub struct ModeratePhotoRequest {
    pub decision: PhotoDecision,
}

async fn list_pending(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Query(query): Query<PendingQuery>,
) -> AppResult<ApiResponse<Vec<PendingPhoto>>> {
    let pending = state
        .moderation_service
        .pending_photo_moderations(&principal, query.limit, query.offset)
        .await?;
    Ok(ApiResponse::ok(pending))
}

async fn moderate_photo(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<ModeratePhotoRequest>,
) -> AppResult<ApiResponse<PhotoModerationOutcome>> {
    let outcome = state
        .moderation_service
        .moderate_photo(&principal, &user_id, req.decision)
        .await?;
    Ok(ApiResponse::ok(outcome))
}

async fn ban(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<BanInput>,
) -> AppResult<ApiResponse<BanOutcome>> {
    let outcome = state
        .moderation_service
        .ban(&principal, &user_id, req)
        .await?;
    Ok(ApiResponse::ok(outcome))
}

async fn unban(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<BanOutcome>> {
    let outcome = state
        .moderation_service
        .unban(&principal, &user_id)
        .await?;
    Ok(ApiResponse::ok(outcome))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/photos/pending", get(list_pending))
        .route("/users/{user_id}/photo", post(moderate_photo))
        .route("/users/{user_id}/ban", post(ban))
        .route("/users/{user_id}/unban", post(unban))
}
