//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request, header},
    middleware::Next,
    response::Response,
};
use profile_common::{AuthConfig, IdGenerator, LimitsConfig};
use profile_core::{
    HealthService, InterestService, ModerationService, PhotoService, ProfileCache, ProfileService,
    SearchService, SettingsService, SharedProfileStore, SubscriptionService, VerificationService,
};

use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::{Span, info_span};

use crate::auth::TokenVerifier;

/// Header carrying the per-request trace id, echoed on every response.
pub static TRACE_ID_HEADER: HeaderName = HeaderName::from_static("x-trace-id");

/// Fallback header some gateways use for the same purpose.
static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub profile_service: ProfileService,
    pub settings_service: SettingsService,
    pub interest_service: InterestService,
    pub photo_service: PhotoService,
    pub moderation_service: ModerationService,
    pub verification_service: VerificationService,
    pub subscription_service: SubscriptionService,
    pub search_service: SearchService,
    pub health_service: HealthService,
    pub tokens: Arc<TokenVerifier>,
}

impl AppState {
    /// Wire every service over one row store and one cache.
    #[must_use]
    pub fn new(
        store: SharedProfileStore,
        cache: ProfileCache,
        limits: LimitsConfig,
        auth: &AuthConfig,
    ) -> Self {
        Self {
            profile_service: ProfileService::new(store.clone(), cache.clone()),
            settings_service: SettingsService::new(store.clone(), cache.clone()),
            interest_service: InterestService::new(store.clone(), cache.clone(), limits),
            photo_service: PhotoService::new(store.clone(), cache.clone(), limits),
            moderation_service: ModerationService::new(store.clone(), cache.clone()),
            verification_service: VerificationService::new(store.clone(), cache.clone()),
            subscription_service: SubscriptionService::new(store.clone(), cache.clone()),
            search_service: SearchService::new(store.clone()),
            health_service: HealthService::new(store, cache),
            tokens: Arc::new(TokenVerifier::new(auth)),
        }
    }
}

/// Authentication middleware.
///
/// A valid bearer token puts the caller's `Principal` into the request
/// extensions. Anything else passes through unauthenticated and is rejected
/// by the extractor on routes that need a caller.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned);

    if let Some(token) = token {
        if let Ok(principal) = state.tokens.verify(&token) {
            req.extensions_mut().insert(principal);
        }
    }

    next.run(req).await
}

/// Trace ids for requests that arrive without `X-Trace-ID`.
///
/// An incoming `X-Request-ID` is reused; otherwise a fresh ULID is minted.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeTraceId {
    ids: IdGenerator,
}

impl MakeRequestId for MakeTraceId {
    fn make_request_id<B>(&mut self, request: &Request<B>) -> Option<RequestId> {
        let id = match request.headers().get(&REQUEST_ID_HEADER) {
            Some(value) => value.clone(),
            None => HeaderValue::from_str(&self.ids.generate()).ok()?,
        };
        Some(RequestId::new(id))
    }
}

/// Span for one HTTP request. Every event logged while handling the request
/// carries its `trace_id`.
pub fn request_span(request: &Request<Body>) -> Span {
    let trace_id = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("-");

    info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        trace_id = %trace_id,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn trace_id_for(request: &Request<()>) -> String {
        let id = MakeTraceId::default().make_request_id(request).unwrap();
        id.header_value().to_str().unwrap().to_string()
    }

    #[test]
    fn test_reuses_gateway_request_id() {
        let request = Request::builder()
            .header("x-request-id", "gw-123")
            .body(())
            .unwrap();
        assert_eq!(trace_id_for(&request), "gw-123");
    }

    #[test]
    fn test_mints_ulid_without_headers() {
        let id = trace_id_for(&Request::new(()));
        assert_eq!(id.len(), 26);
    }
}
