//! Profile endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
};
use profile_common::AppResult;
use profile_core::{ProfileSnapshot, ProfileUpdate, ProfileView, UserSummary};
use serde::Deserialize;

use crate::{
    extractors::AuthPrincipal,
    middleware::AppState,
    response::{ApiResponse, no_content},
};

/// Change username request.
#[derive(Debug, Deserialize)]
pub struct UpdateUsernameRequest {
    pub username: String,
}

/// Delete account request.
#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub confirmation: String,
}

/// Search query.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    20
}

/// Get own profile.
async fn get_me(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<ProfileView>> {
    let view = state
        .profile_service
        .get_profile(&principal.user_id, &principal.user_id)
        .await?;
    Ok(ApiResponse::ok(view))
}

/// Update own profile.
async fn update_me(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Json(req): Json<ProfileUpdate>,
) -> AppResult<ApiResponse<ProfileSnapshot>> {
    let snapshot = state
        .profile_service
        .update_profile(&principal.user_id, req)
        .await?;
    Ok(ApiResponse::ok(snapshot))
}

/// Delete own account.
async fn delete_me(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Json(req): Json<DeleteAccountRequest>,
) -> AppResult<impl IntoResponse> {
    state
        .profile_service
        .delete_account(&principal.user_id, &req.confirmation)
        .await?;
    Ok(no_content())
}

/// Change own username.
async fn update_username(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Json(req): Json<UpdateUsernameRequest>,
) -> AppResult<ApiResponse<ProfileSnapshot>> {
    let snapshot = state
        .profile_service
        .update_username(&principal.user_id, &req.username)
        .await?;
    Ok(ApiResponse::ok(snapshot))
}

/// Record presence.
async fn heartbeat(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    state.search_service.heartbeat(&principal.user_id).await?;
    Ok(no_content())
}

/// Search users.
async fn search(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<ApiResponse<Vec<UserSummary>>> {
    let users = state
        .search_service
        .search_users(&query.q, &principal.user_id, query.limit, query.offset)
        .await?;
    Ok(ApiResponse::ok(users))
}

/// Get another user's profile.
async fn get_user(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<ProfileView>> {
    let view = state
        .profile_service
        .get_public_profile(&user_id, &principal)
        .await?;
    Ok(ApiResponse::ok(view))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).patch(update_me).delete(delete_me))
        .route("/me/username", put(update_username))
        .route("/me/heartbeat", post(heartbeat))
        .route("/search", get(search))
        .route("/{user_id}", get(get_user))
}
