//! Common utilities and shared types for the profile backend.
//!
//! This crate provides foundational components used across all profile crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Cache backends**: The [`CacheStore`] seam and its Redis implementation
//!
//! # Example
//!
//! ```no_run
//! use profile_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id = IdGenerator::new().generate();
//!     println!("{} listening on {id}", config.server.port);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod id;

#[cfg(any(test, feature = "test-utils"))]
pub use cache::MemoryCacheStore;
pub use cache::{CacheError, CacheStore, RedisCacheStore};
pub use config::{
    AuthConfig, CacheConfig, Config, LimitsConfig, LogFormat, LoggingConfig, RateLimitConfig,
};
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
