//! Settings endpoints.

use axum::{Json, Router, extract::State, routing::get};
use profile_common::AppResult;
use profile_core::SettingsUpdate;
use profile_db::entities::user_settings;

use crate::{extractors::AuthPrincipal, middleware::AppState, response::ApiResponse};

async fn get_settings(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<user_settings::Model>> {
    let settings = state
        .settings_service
        .get_settings(&principal.user_id)
        .await?;
    Ok(ApiResponse::ok(settings))
}

async fn update_settings(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Json(req): Json<SettingsUpdate>,
) -> AppResult<ApiResponse<user_settings::Model>> {
    let settings = state
        .settings_service
        .update_settings(&principal.user_id, req)
        .await?;
    Ok(ApiResponse::ok(settings))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/me/settings", get(get_settings).patch(update_settings))
}
