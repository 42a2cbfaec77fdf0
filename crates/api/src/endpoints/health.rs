//! Health endpoint.

use axum::{Router, extract::State, http::StatusCode, routing::get};
use profile_core::HealthReport;

use crate::{middleware::AppState, response::ApiResponse};

/// Database reachability decides the status code; the cache is informational.
async fn health(State(state): State<AppState>) -> ApiResponse<HealthReport> {
    let report = state.health_service.check().await;
    let status = if report.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    ApiResponse::ok(report).with_status(status)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
