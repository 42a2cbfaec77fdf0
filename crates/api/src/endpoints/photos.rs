//! Photo endpoints.

use axum::{
    Json, Router,
    extract::State,
    routing::{post, put},
};
use profile_common::AppResult;
use profile_core::PhotoSet;
use serde::Deserialize;

use crate::{extractors::AuthPrincipal, middleware::AppState, response::ApiResponse};

/// Photo URL request.
#[derive(Debug, Deserialize)]
pub struct PhotoRequest {
    pub url: String,
}

async fn set_main_photo(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Json(req): Json<PhotoRequest>,
) -> AppResult<ApiResponse<PhotoSet>> {
    let photos = state
        .photo_service
        .set_main_photo(&principal.user_id, &req.url)
        .await?;
    Ok(ApiResponse::ok(photos))
}

async fn add_photo(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Json(req): Json<PhotoRequest>,
) -> AppResult<ApiResponse<PhotoSet>> {
    let photos = state
        .photo_service
        .add_extra_photo(&principal.user_id, &req.url)
        .await?;
    Ok(ApiResponse::ok(photos))
}

async fn remove_photo(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Json(req): Json<PhotoRequest>,
) -> AppResult<ApiResponse<PhotoSet>> {
    let photos = state
        .photo_service
        .remove_extra_photo(&principal.user_id, &req.url)
        .await?;
    Ok(ApiResponse::ok(photos))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me/photos/main", put(set_main_photo))
        .route("/me/photos", post(add_photo).delete(remove_photo))
}
