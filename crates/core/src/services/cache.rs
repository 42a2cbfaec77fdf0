//! Best-effort cache in front of per-user profile resources.
//!
//! Every operation absorbs backend failures: a failed read is a miss and a
//! failed write or delete is reported through the returned flag, never as an
//! error. With caching disabled every read misses and every write silently
//! succeeds.

use std::sync::Arc;
use std::time::Duration;

use profile_common::{CacheConfig, CacheStore};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

/// Unit of cache granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Profile,
    Settings,
    Interests,
}

impl ResourceType {
    /// Every resource cached for a user.
    pub const ALL: [Self; 3] = [Self::Profile, Self::Settings, Self::Interests];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Settings => "settings",
            Self::Interests => "interests",
        }
    }

    /// Cache key for this resource of a user.
    #[must_use]
    pub fn key(self, user_id: &str) -> String {
        format!("user_{}:{user_id}", self.as_str())
    }
}

/// Backend reachability as seen by the health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Healthy,
    Unavailable,
    Disabled,
}

#[derive(Debug, Clone, Copy)]
struct Ttls {
    profile: Duration,
    settings: Duration,
    interests: Duration,
}

impl From<&CacheConfig> for Ttls {
    fn from(config: &CacheConfig) -> Self {
        Self {
            profile: Duration::from_secs(config.profile_ttl_secs),
            settings: Duration::from_secs(config.settings_ttl_secs),
            interests: Duration::from_secs(config.interests_ttl_secs),
        }
    }
}

/// Cache for profile, settings and interests snapshots.
#[derive(Clone)]
pub struct ProfileCache {
    store: Option<Arc<dyn CacheStore>>,
    ttls: Ttls,
}

impl ProfileCache {
    /// Create a cache over `store`. Returns a disabled cache when the config
    /// says so.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self {
            store: config.enabled.then_some(store),
            ttls: Ttls::from(config),
        }
    }

    /// A cache where every operation is a no-op.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            store: None,
            ttls: Ttls::from(&CacheConfig::default()),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// TTL applied to a resource when none is given.
    #[must_use]
    pub const fn ttl_for(&self, resource: ResourceType) -> Duration {
        match resource {
            ResourceType::Profile => self.ttls.profile,
            ResourceType::Settings => self.ttls.settings,
            ResourceType::Interests => self.ttls.interests,
        }
    }

    /// Read a snapshot. Any failure is a miss.
    pub async fn get<T: DeserializeOwned>(&self, resource: ResourceType, user_id: &str) -> Option<T> {
        let store = self.store.as_ref()?;
        let key = resource.key(user_id);

        match store.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!(resource = resource.as_str(), key = %key, "Cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(resource = resource.as_str(), key = %key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => {
                debug!(resource = resource.as_str(), key = %key, "Cache miss");
                None
            }
            Err(e) => {
                warn!(resource = resource.as_str(), key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Write a snapshot with the resource's TTL. Returns false if the write
    /// failed.
    pub async fn set<T: Serialize + Sync>(
        &self,
        resource: ResourceType,
        user_id: &str,
        value: &T,
    ) -> bool {
        let Some(store) = self.store.as_ref() else {
            return true;
        };
        let key = resource.key(user_id);
        let ttl = self.ttl_for(resource);

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(resource = resource.as_str(), key = %key, error = %e, "Failed to serialize cache entry");
                return false;
            }
        };

        match store.set_ex(&key, raw, ttl).await {
            Ok(()) => {
                debug!(resource = resource.as_str(), key = %key, ttl_secs = ttl.as_secs(), "Cache set");
                true
            }
            Err(e) => {
                warn!(resource = resource.as_str(), key = %key, error = %e, "Cache write failed");
                false
            }
        }
    }

    /// Drop one resource of a user.
    pub async fn invalidate(&self, resource: ResourceType, user_id: &str) -> bool {
        self.invalidate_many(user_id, &[resource]).await
    }

    /// Drop several resources of a user with one multi-key delete.
    pub async fn invalidate_many(&self, user_id: &str, resources: &[ResourceType]) -> bool {
        let Some(store) = self.store.as_ref() else {
            return true;
        };
        let keys: Vec<String> = resources.iter().map(|r| r.key(user_id)).collect();

        match store.del(&keys).await {
            Ok(removed) => {
                debug!(user_id = %user_id, keys = ?keys, removed, "Cache invalidated");
                true
            }
            Err(e) => {
                warn!(user_id = %user_id, keys = ?keys, error = %e, "Cache invalidation failed");
                false
            }
        }
    }

    /// Drop every cached resource of a user.
    pub async fn invalidate_all(&self, user_id: &str) -> bool {
        self.invalidate_many(user_id, &ResourceType::ALL).await
    }

    /// Ping the backend.
    pub async fn status(&self) -> CacheStatus {
        let Some(store) = self.store.as_ref() else {
            return CacheStatus::Disabled;
        };
        match store.ping().await {
            Ok(()) => CacheStatus::Healthy,
            Err(e) => {
                warn!(error = %e, "Cache health check failed");
                CacheStatus::Unavailable
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use profile_common::MemoryCacheStore;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        name: String,
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            name: "alice".to_string(),
        }
    }

    fn cache_with(store: &Arc<MemoryCacheStore>) -> ProfileCache {
        ProfileCache::new(store.clone(), &CacheConfig::default())
    }

    #[test]
    fn test_keys() {
        assert_eq!(ResourceType::Profile.key("42"), "user_profile:42");
        assert_eq!(ResourceType::Settings.key("42"), "user_settings:42");
        assert_eq!(ResourceType::Interests.key("42"), "user_interests:42");
    }

    #[test]
    fn test_default_ttls() {
        let cache = ProfileCache::disabled();
        assert_eq!(cache.ttl_for(ResourceType::Profile), Duration::from_secs(300));
        assert_eq!(cache.ttl_for(ResourceType::Settings), Duration::from_secs(1800));
        assert_eq!(cache.ttl_for(ResourceType::Interests), Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = Arc::new(MemoryCacheStore::new());
        let cache = cache_with(&store);

        assert!(cache.set(ResourceType::Profile, "u1", &snapshot()).await);
        let cached: Option<Snapshot> = cache.get(ResourceType::Profile, "u1").await;
        assert_eq!(cached, Some(snapshot()));
    }

    #[tokio::test]
    async fn test_invalidate_all_removes_every_resource() {
        let store = Arc::new(MemoryCacheStore::new());
        let cache = cache_with(&store);
        for resource in ResourceType::ALL {
            cache.set(resource, "u1", &snapshot()).await;
        }
        cache.set(ResourceType::Profile, "u2", &snapshot()).await;

        assert!(cache.invalidate_all("u1").await);
        assert_eq!(store.len().await, 1);
        assert!(store.contains("user_profile:u2").await);
    }

    #[tokio::test]
    async fn test_backend_outage_is_absorbed() {
        let store = Arc::new(MemoryCacheStore::new());
        let cache = cache_with(&store);
        cache.set(ResourceType::Profile, "u1", &snapshot()).await;

        store.set_unavailable(true);
        let cached: Option<Snapshot> = cache.get(ResourceType::Profile, "u1").await;
        assert!(cached.is_none());
        assert!(!cache.set(ResourceType::Profile, "u1", &snapshot()).await);
        assert!(!cache.invalidate_all("u1").await);
        assert_eq!(cache.status().await, CacheStatus::Unavailable);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let store = Arc::new(MemoryCacheStore::new());
        store
            .set_ex("user_profile:u1", "not json".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        let cache = cache_with(&store);

        let cached: Option<Snapshot> = cache.get(ResourceType::Profile, "u1").await;
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_disabled_cache_is_silent() {
        let store = Arc::new(MemoryCacheStore::new());
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let cache = ProfileCache::new(store.clone(), &config);

        assert!(cache.set(ResourceType::Profile, "u1", &snapshot()).await);
        let cached: Option<Snapshot> = cache.get(ResourceType::Profile, "u1").await;
        assert!(cached.is_none());
        assert!(cache.invalidate_all("u1").await);
        assert_eq!(store.len().await, 0);
        assert_eq!(cache.status().await, CacheStatus::Disabled);
    }
}
