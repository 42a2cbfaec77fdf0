//! Dependency health.

use serde::Serialize;
use tracing::warn;

use super::cache::{CacheStatus, ProfileCache};
use super::store::SharedProfileStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseStatus {
    Healthy,
    Unavailable,
}

/// Result of a health check.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub database: DatabaseStatus,
    pub cache: CacheStatus,
}

#[derive(Clone)]
pub struct HealthService {
    store: SharedProfileStore,
    cache: ProfileCache,
}

impl HealthService {
    /// Create a new health service.
    #[must_use]
    pub const fn new(store: SharedProfileStore, cache: ProfileCache) -> Self {
        Self { store, cache }
    }

    /// Ping both stores. Only the database decides overall health.
    pub async fn check(&self) -> HealthReport {
        let database = match self.store.ping().await {
            Ok(()) => DatabaseStatus::Healthy,
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                DatabaseStatus::Unavailable
            }
        };
        let cache = self.cache.status().await;

        HealthReport {
            healthy: database == DatabaseStatus::Healthy,
            database,
            cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::MemoryProfileStore;
    use profile_common::{CacheConfig, MemoryCacheStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_cache_outage_does_not_fail_check() {
        let cache_store = Arc::new(MemoryCacheStore::new());
        cache_store.set_unavailable(true);
        let cache = ProfileCache::new(cache_store, &CacheConfig::default());
        let service = HealthService::new(Arc::new(MemoryProfileStore::new()), cache);

        let report = service.check().await;

        assert!(report.healthy);
        assert_eq!(report.cache, CacheStatus::Unavailable);
    }

    #[tokio::test]
    async fn test_disabled_cache_reported() {
        let service = HealthService::new(
            Arc::new(MemoryProfileStore::new()),
            ProfileCache::disabled(),
        );
        assert_eq!(service.check().await.cache, CacheStatus::Disabled);
    }
}
