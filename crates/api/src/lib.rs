//! HTTP API layer for the profile service.
//!
//! - **Endpoints**: profile, settings, interests, photos, subscription,
//!   verification, moderation and health routes
//! - **Auth**: HS256 bearer tokens decoded into a `Principal`
//! - **Extractors**: the authenticated caller
//! - **Rate limiting**: fixed-window read and write budgets per caller
//! - **Tracing**: a trace id per request, echoed as `X-Trace-ID`
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod auth;
pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod rate_limit;
pub mod response;

pub use auth::{Claims, TokenVerifier};
pub use endpoints::router;
pub use middleware::{AppState, MakeTraceId, TRACE_ID_HEADER, auth_middleware, request_span};
pub use rate_limit::{RateLimiterState, rate_limit_middleware};
