//! API endpoints.

mod health;
mod interests;
mod moderation;
mod photos;
mod settings;
mod subscription;
mod users;
mod verification;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    let users = users::router()
        .merge(settings::router())
        .merge(interests::router())
        .merge(photos::router())
        .merge(subscription::router())
        .merge(verification::router());

    Router::new()
        .merge(health::router())
        .nest("/users", users)
        .nest("/moderation", moderation::router())
}
