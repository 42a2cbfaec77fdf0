//! Profile server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, middleware};
use fred::interfaces::ClientLike;
use profile_api::{
    AppState, MakeTraceId, RateLimiterState, TRACE_ID_HEADER, auth_middleware, rate_limit_middleware,
    request_span, router as api_router,
};
use profile_common::{Config, LogFormat, RedisCacheStore};
use profile_core::{DatabaseProfileStore, ProfileCache};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Console => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn connect_cache(config: &Config) -> Result<ProfileCache, Box<dyn std::error::Error>> {
    if !config.cache.enabled {
        info!("Profile cache disabled");
        return Ok(ProfileCache::disabled());
    }

    info!("Connecting to Redis...");
    let fred_config = fred::types::config::Config::from_url(&config.redis.url)?;
    let client = fred::clients::Client::new(fred_config, None, None, None);
    client.connect();
    client.wait_for_connect().await?;
    info!("Connected to Redis");

    let store = RedisCacheStore::new(Arc::new(client), config.redis.prefix.clone());
    Ok(ProfileCache::new(Arc::new(store), &config.cache))
}

fn spawn_limiter_cleanup(limiter: RateLimiterState, window_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(window_secs.max(1)));
        loop {
            interval.tick().await;
            limiter.cleanup().await;
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load()?;
    init_tracing(&config);

    info!("Starting profile server...");

    // Connect to database
    let db = profile_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    profile_db::migrate(&db).await?;
    info!("Migrations completed");

    let cache = connect_cache(&config).await?;
    let store = Arc::new(DatabaseProfileStore::new(Arc::new(db)));
    let state = AppState::new(store, cache, config.limits, &config.auth);

    let limiter = RateLimiterState::new(config.rate_limit);
    if config.rate_limit.enabled {
        spawn_limiter_cleanup(limiter.clone(), config.rate_limit.window_secs);
    }

    // Build router. Layers run bottom-up: the trace id is set before the
    // request span opens, and auth runs before rate limiting so callers are
    // keyed by user id.
    let app = Router::new()
        .nest("/api/v1", api_router())
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(PropagateRequestIdLayer::new(TRACE_ID_HEADER.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(SetRequestIdLayer::new(
            TRACE_ID_HEADER.clone(),
            MakeTraceId::default(),
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers([TRACE_ID_HEADER.clone()]),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}
