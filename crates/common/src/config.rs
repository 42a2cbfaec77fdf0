//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration.
    pub redis: RedisConfig,
    /// Profile cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Token verification configuration.
    pub auth: AuthConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Collection bounds.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Per-caller request rate limits.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
    /// Key prefix for all Redis keys.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

/// Profile cache configuration.
///
/// Profile entries expire quickly so ban and moderation changes propagate;
/// settings and interests change rarely and live longer.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// When false every cache operation is a silent no-op.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// TTL for profile snapshots.
    #[serde(default = "default_profile_ttl")]
    pub profile_ttl_secs: u64,
    /// TTL for settings.
    #[serde(default = "default_settings_ttl")]
    pub settings_ttl_secs: u64,
    /// TTL for interests.
    #[serde(default = "default_interests_ttl")]
    pub interests_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            profile_ttl_secs: default_profile_ttl(),
            settings_ttl_secs: default_settings_ttl(),
            interests_ttl_secs: default_interests_ttl(),
        }
    }
}

/// Bearer token verification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret shared with the token issuer.
    pub jwt_secret: String,
    /// Expected `iss` claim, if any.
    #[serde(default)]
    pub jwt_issuer: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human readable output.
    Console,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Collection bounds for per-user resources.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of extra profile photos.
    #[serde(default = "default_max_extra_photos")]
    pub max_extra_photos: usize,
    /// Maximum number of interest tags.
    #[serde(default = "default_max_interests")]
    pub max_interests: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_extra_photos: default_max_extra_photos(),
            max_interests: default_max_interests(),
        }
    }
}

/// Per-caller request rate limits.
///
/// Callers are keyed by user id when authenticated, otherwise by client IP.
/// Reads and writes are counted in separate fixed windows.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateLimitConfig {
    /// When false no request is ever limited.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Read requests allowed per window.
    #[serde(default = "default_read_requests")]
    pub read_requests: u32,
    /// Write requests allowed per window.
    #[serde(default = "default_write_requests")]
    pub write_requests: u32,
    /// Window length in seconds.
    #[serde(default = "default_rate_window")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            read_requests: default_read_requests(),
            write_requests: default_write_requests(),
            window_secs: default_rate_window(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_redis_prefix() -> String {
    String::new()
}

const fn default_true() -> bool {
    true
}

const fn default_profile_ttl() -> u64 {
    300
}

const fn default_settings_ttl() -> u64 {
    1800
}

const fn default_interests_ttl() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_max_extra_photos() -> usize {
    8
}

const fn default_max_interests() -> usize {
    20
}

const fn default_read_requests() -> u32 {
    300
}

const fn default_write_requests() -> u32 {
    60
}

const fn default_rate_window() -> u64 {
    60
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `PROFILE_ENV`)
    /// 3. Environment variables with `PROFILE__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("PROFILE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PROFILE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("PROFILE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
