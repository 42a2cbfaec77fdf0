//! Key-value cache backends.
//!
//! [`CacheStore`] is the narrow contract the profile cache needs from its
//! backend: string get, string set with TTL, multi-key delete and a ping.
//! [`RedisCacheStore`] implements it over a shared `fred` client.
//!
//! # Example
//!
//! ```ignore
//! use profile_common::cache::{CacheStore, RedisCacheStore};
//! use std::{sync::Arc, time::Duration};
//!
//! let store = RedisCacheStore::new(Arc::new(redis_client), "profile");
//! store.set_ex("user_profile:42", "{}".into(), Duration::from_secs(300)).await?;
//! ```

use async_trait::async_trait;
use fred::clients::Client as RedisClient;
use fred::interfaces::{ClientLike, KeysInterface};
use fred::types::Expiration;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cache backend error type.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Backend operation failed.
    #[error("Redis error: {0}")]
    Redis(String),
}

/// TTL-keyed string store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Write a value that expires after `ttl`.
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Delete several keys in one round trip. Returns the number removed.
    async fn del(&self, keys: &[String]) -> Result<u64, CacheError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), CacheError>;
}

/// Redis-backed [`CacheStore`].
#[derive(Clone)]
pub struct RedisCacheStore {
    redis: Arc<RedisClient>,
    prefix: String,
}

impl RedisCacheStore {
    /// Create a new store. An empty prefix leaves keys untouched.
    #[must_use]
    pub fn new(redis: Arc<RedisClient>, prefix: impl Into<String>) -> Self {
        Self {
            redis,
            prefix: prefix.into(),
        }
    }

    fn full_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{key}", self.prefix)
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.redis
            .get::<Option<String>, _>(self.full_key(key))
            .await
            .map_err(|e| CacheError::Redis(e.to_string()))
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.redis
            .set::<(), _, _>(
                self.full_key(key),
                value,
                Some(Expiration::EX(ttl.as_secs() as i64)),
                None,
                false,
            )
            .await
            .map_err(|e| CacheError::Redis(e.to_string()))
    }

    async fn del(&self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let full_keys: Vec<String> = keys.iter().map(|k| self.full_key(k)).collect();
        let removed = self
            .redis
            .del::<i64, _>(full_keys)
            .await
            .map_err(|e| CacheError::Redis(e.to_string()))?;
        debug!(count = removed, "Deleted cache keys");
        Ok(removed.max(0) as u64)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.redis
            .ping::<String>(None)
            .await
            .map(|_| ())
            .map_err(|e| CacheError::Redis(e.to_string()))
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryCacheStore;

#[cfg(any(test, feature = "test-utils"))]
mod memory {
    use super::{CacheError, CacheStore};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};
    use tokio::sync::RwLock;

    /// In-process [`CacheStore`] with expiry and a switchable outage.
    #[derive(Default)]
    pub struct MemoryCacheStore {
        entries: RwLock<HashMap<String, (String, Instant)>>,
        unavailable: AtomicBool,
    }

    impl MemoryCacheStore {
        /// Create an empty store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every subsequent call fail (or succeed again).
        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        /// Whether a live entry exists, bypassing the outage switch.
        pub async fn contains(&self, key: &str) -> bool {
            self.entries
                .read()
                .await
                .get(key)
                .is_some_and(|(_, expires)| *expires > Instant::now())
        }

        /// Number of live entries.
        pub async fn len(&self) -> usize {
            let now = Instant::now();
            self.entries
                .read()
                .await
                .values()
                .filter(|(_, expires)| *expires > now)
                .count()
        }

        fn check(&self) -> Result<(), CacheError> {
            if self.unavailable.load(Ordering::SeqCst) {
                Err(CacheError::Redis("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl CacheStore for MemoryCacheStore {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.check()?;
            let entries = self.entries.read().await;
            Ok(entries
                .get(key)
                .filter(|(_, expires)| *expires > Instant::now())
                .map(|(value, _)| value.clone()))
        }

        async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
            self.check()?;
            self.entries
                .write()
                .await
                .insert(key.to_string(), (value, Instant::now() + ttl));
            Ok(())
        }

        async fn del(&self, keys: &[String]) -> Result<u64, CacheError> {
            self.check()?;
            let mut entries = self.entries.write().await;
            Ok(keys.iter().filter(|k| entries.remove(*k).is_some()).count() as u64)
        }

        async fn ping(&self) -> Result<(), CacheError> {
            self.check()
        }
    }
}
