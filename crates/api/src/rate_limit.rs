//! API rate limiting middleware.
//!
//! Fixed-window limits per caller: the authenticated user when the auth
//! middleware found one, otherwise the client IP. Reads and writes are
//! counted separately.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use profile_common::RateLimitConfig;
use profile_core::Principal;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;

static LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
static REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
static RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Which budget a request draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Read,
    Write,
}

impl Tier {
    fn for_method(method: &Method) -> Self {
        if matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS) {
            Self::Read
        } else {
            Self::Write
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// Request count of one key in its current window.
#[derive(Debug, Clone)]
struct Window {
    count: u32,
    started: Instant,
}

/// Rate limit check result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed.
    Allowed {
        remaining: u32,
        limit: u32,
        /// Seconds until the window resets.
        reset: u64,
    },
    /// Request is rate limited.
    Limited { retry_after: u64, limit: u32 },
}

/// Shared limiter state for the middleware.
#[derive(Clone)]
pub struct RateLimiterState {
    config: RateLimitConfig,
    windows: Arc<RwLock<HashMap<String, Window>>>,
}

impl RateLimiterState {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    const fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_secs)
    }

    const fn max_requests(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Read => self.config.read_requests,
            Tier::Write => self.config.write_requests,
        }
    }

    /// Check if a request is allowed and record it.
    pub async fn check(&self, key: &str, tier: Tier) -> RateLimitResult {
        let limit = self.max_requests(tier);
        let window = self.window();
        let now = Instant::now();

        let mut windows = self.windows.write().await;
        let state = windows
            .entry(format!("{key}:{}", tier.as_str()))
            .or_insert_with(|| Window {
                count: 0,
                started: now,
            });

        if now.duration_since(state.started) >= window {
            state.count = 0;
            state.started = now;
        }

        let reset = window
            .saturating_sub(now.duration_since(state.started))
            .as_secs();

        if state.count >= limit {
            return RateLimitResult::Limited {
                retry_after: reset.max(1),
                limit,
            };
        }

        state.count += 1;
        RateLimitResult::Allowed {
            remaining: limit.saturating_sub(state.count),
            limit,
            reset,
        }
    }

    /// Drop windows that ended before the current one could have started.
    pub async fn cleanup(&self) {
        let max_age = self.window() * 2;
        let now = Instant::now();
        self.windows
            .write()
            .await
            .retain(|_, state| now.duration_since(state.started) < max_age);
    }

    /// Number of tracked windows.
    pub async fn key_count(&self) -> usize {
        self.windows.read().await.len()
    }
}

/// Rate limit error response.
#[derive(Debug)]
pub struct RateLimitError {
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": "RATE_LIMIT_EXCEEDED",
                "message": "Too many requests",
                "details": { "retry_after": self.retry_after }
            }
        });

        (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, HeaderValue::from(self.retry_after))],
            Json(body),
        )
            .into_response()
    }
}

/// Client IP from proxy headers, falling back to the peer address.
fn client_ip(req: &Request<Body>) -> Option<IpAddr> {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());
    if forwarded.is_some() {
        return forwarded;
    }

    let real_ip = req
        .headers()
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<IpAddr>().ok());
    if real_ip.is_some() {
        return real_ip;
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

fn caller_key(req: &Request<Body>) -> String {
    if let Some(principal) = req.extensions().get::<Principal>() {
        format!("user:{}", principal.user_id)
    } else if let Some(ip) = client_ip(req) {
        format!("ip:{ip}")
    } else {
        "anonymous".to_string()
    }
}

/// Rate limiting middleware. Runs inside the auth middleware so callers with
/// a valid token are limited by user id. Health checks are never limited.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiterState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, RateLimitError> {
    if !limiter.config.enabled || req.uri().path().ends_with("/health") {
        return Ok(next.run(req).await);
    }

    let key = caller_key(&req);
    let tier = Tier::for_method(req.method());

    match limiter.check(&key, tier).await {
        RateLimitResult::Allowed {
            remaining,
            limit,
            reset,
        } => {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            headers.insert(LIMIT_HEADER.clone(), limit.into());
            headers.insert(REMAINING_HEADER.clone(), remaining.into());
            headers.insert(RESET_HEADER.clone(), reset.into());
            Ok(response)
        }
        RateLimitResult::Limited { retry_after, limit } => {
            debug!(key = %key, tier = tier.as_str(), limit, retry_after, "Rate limited");
            Err(RateLimitError { retry_after })
        }
    }
}
