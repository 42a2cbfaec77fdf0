//! Interest endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get},
};
use profile_common::AppResult;
use profile_core::{Interest, InterestInput};
use serde::Deserialize;

use crate::{extractors::AuthPrincipal, middleware::AppState, response::ApiResponse};

/// Replace interests request.
#[derive(Debug, Deserialize)]
pub struct SetInterestsRequest {
    pub interests: Vec<InterestInput>,
}

async fn get_interests(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<Interest>>> {
    let interests = state
        .interest_service
        .get_interests(&principal.user_id)
        .await?;
    Ok(ApiResponse::ok(interests))
}

async fn set_interests(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Json(req): Json<SetInterestsRequest>,
) -> AppResult<ApiResponse<Vec<Interest>>> {
    let interests = state
        .interest_service
        .set_interests(&principal.user_id, req.interests)
        .await?;
    Ok(ApiResponse::ok(interests))
}

async fn add_interest(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Json(req): Json<InterestInput>,
) -> AppResult<ApiResponse<Vec<Interest>>> {
    let interests = state
        .interest_service
        .add_interest(&principal.user_id, req)
        .await?;
    Ok(ApiResponse::ok(interests))
}

async fn remove_interest(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> AppResult<ApiResponse<Vec<Interest>>> {
    let interests = state
        .interest_service
        .remove_interest(&principal.user_id, &tag)
        .await?;
    Ok(ApiResponse::ok(interests))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/me/interests",
            get(get_interests).put(set_interests).post(add_interest),
        )
        .route("/me/interests/{tag}", delete(remove_interest))
}
