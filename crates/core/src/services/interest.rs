//! Interest tags of a user.

use std::collections::HashSet;

use chrono::Utc;
use profile_common::{AppError, AppResult, LimitsConfig};
use profile_db::entities::user_interest;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::cache::{ProfileCache, ResourceType};
use super::store::SharedProfileStore;

const DEFAULT_WEIGHT: f64 = 1.0;

/// A tag with its relevance weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interest {
    pub tag: String,
    pub weight: f64,
}

impl From<user_interest::Model> for Interest {
    fn from(model: user_interest::Model) -> Self {
        Self {
            tag: model.interest_tag,
            weight: model.weight,
        }
    }
}

/// Input for adding or replacing an interest.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InterestInput {
    #[validate(length(min = 1, max = 100))]
    pub tag: String,
    /// Defaults to 1.0.
    #[validate(range(min = 0.0, max = 1.0))]
    pub weight: Option<f64>,
}

impl InterestInput {
    pub fn new(tag: impl Into<String>, weight: Option<f64>) -> Self {
        Self {
            tag: tag.into(),
            weight,
        }
    }

    fn normalized(&self) -> AppResult<Interest> {
        self.validate()?;
        let tag = self.tag.trim();
        if tag.is_empty() {
            return Err(AppError::validation("tag", "must not be blank"));
        }
        Ok(Interest {
            tag: tag.to_string(),
            weight: self.weight.unwrap_or(DEFAULT_WEIGHT),
        })
    }
}

#[derive(Clone)]
pub struct InterestService {
    store: SharedProfileStore,
    cache: ProfileCache,
    limits: LimitsConfig,
}

impl InterestService {
    /// Create a new interest service.
    #[must_use]
    pub const fn new(store: SharedProfileStore, cache: ProfileCache, limits: LimitsConfig) -> Self {
        Self {
            store,
            cache,
            limits,
        }
    }

    /// Interests of a user, strongest first.
    pub async fn get_interests(&self, user_id: &str) -> AppResult<Vec<Interest>> {
        if let Some(cached) = self.cache.get(ResourceType::Interests, user_id).await {
            return Ok(cached);
        }

        self.store.get_live_user(user_id).await?;
        let interests: Vec<Interest> = self
            .store
            .find_interests(user_id)
            .await?
            .into_iter()
            .map(Interest::from)
            .collect();

        self.cache
            .set(ResourceType::Interests, user_id, &interests)
            .await;
        Ok(interests)
    }

    /// Replace every interest. The whole batch is rejected if it is too large
    /// or repeats a tag, ignoring case.
    pub async fn set_interests(
        &self,
        user_id: &str,
        inputs: Vec<InterestInput>,
    ) -> AppResult<Vec<Interest>> {
        if inputs.len() > self.limits.max_interests {
            return Err(AppError::limit_exceeded(
                "interests",
                self.limits.max_interests,
                inputs.len(),
            ));
        }

        let mut seen = HashSet::new();
        let mut interests = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let interest = input.normalized()?;
            if !seen.insert(interest.tag.to_lowercase()) {
                return Err(AppError::duplicate("interest_tag", interest.tag));
            }
            interests.push(interest);
        }

        self.store.get_live_user(user_id).await?;

        let now = Utc::now();
        let rows = interests
            .iter()
            .map(|i| user_interest::Model {
                user_id: user_id.to_string(),
                interest_tag: i.tag.clone(),
                weight: i.weight,
                created_at: now.into(),
            })
            .collect();
        self.store.replace_interests(user_id, rows).await?;

        self.invalidate(user_id).await;
        info!(user_id = %user_id, count = interests.len(), "Interests replaced");

        self.fetch(user_id).await
    }

    /// Add one interest, or update the weight of a tag the user already has.
    pub async fn add_interest(&self, user_id: &str, input: InterestInput) -> AppResult<Vec<Interest>> {
        let interest = input.normalized()?;
        self.store.get_live_user(user_id).await?;

        let existing = self.store.find_interests(user_id).await?;
        let wanted = interest.tag.to_lowercase();
        let matched = existing
            .iter()
            .find(|e| e.interest_tag.to_lowercase() == wanted);

        let tag = match matched {
            Some(found) => found.interest_tag.clone(),
            None if existing.len() >= self.limits.max_interests => {
                return Err(AppError::limit_exceeded(
                    "interests",
                    self.limits.max_interests,
                    existing.len(),
                ));
            }
            None => interest.tag,
        };

        self.store
            .upsert_interest(user_interest::Model {
                user_id: user_id.to_string(),
                interest_tag: tag.clone(),
                weight: interest.weight,
                created_at: Utc::now().into(),
            })
            .await?;

        self.invalidate(user_id).await;
        info!(user_id = %user_id, tag = %tag, updated = matched.is_some(), "Interest saved");

        self.fetch(user_id).await
    }

    /// Remove a tag, matched ignoring case.
    pub async fn remove_interest(&self, user_id: &str, tag: &str) -> AppResult<Vec<Interest>> {
        self.store.get_live_user(user_id).await?;

        let wanted = tag.trim().to_lowercase();
        let stored = self
            .store
            .find_interests(user_id)
            .await?
            .into_iter()
            .find(|e| e.interest_tag.to_lowercase() == wanted)
            .ok_or_else(|| AppError::not_found("Interest"))?;

        if !self.store.delete_interest(user_id, &stored.interest_tag).await? {
            return Err(AppError::not_found("Interest"));
        }

        self.invalidate(user_id).await;
        info!(user_id = %user_id, tag = %stored.interest_tag, "Interest removed");

        self.fetch(user_id).await
    }

    async fn fetch(&self, user_id: &str) -> AppResult<Vec<Interest>> {
        Ok(self
            .store
            .find_interests(user_id)
            .await?
            .into_iter()
            .map(Interest::from)
            .collect())
    }

    async fn invalidate(&self, user_id: &str) {
        self.cache
            .invalidate_many(user_id, &[ResourceType::Interests, ResourceType::Profile])
            .await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::store::MemoryProfileStore;
    use profile_common::{CacheConfig, MemoryCacheStore};
    use profile_db::test_utils::user_fixture;
    use std::sync::Arc;

    async fn setup() -> (Arc<MemoryCacheStore>, InterestService) {
        let store = Arc::new(MemoryProfileStore::new());
        store.insert_user(user_fixture("u1", "alice")).await;
        let cache_store = Arc::new(MemoryCacheStore::new());
        let cache = ProfileCache::new(cache_store.clone(), &CacheConfig::default());
        let service = InterestService::new(store, cache, LimitsConfig::default());
        (cache_store, service)
    }

    fn tags(n: usize) -> Vec<InterestInput> {
        (0..n)
            .map(|i| InterestInput::new(format!("tag{i}"), None))
            .collect()
    }

    #[tokio::test]
    async fn test_twenty_first_tag_rejected() {
        let (_, service) = setup().await;
        service.set_interests("u1", tags(20)).await.unwrap();

        let result = service
            .add_interest("u1", InterestInput::new("hiking", None))
            .await;

        assert!(matches!(
            result,
            Err(AppError::LimitExceeded {
                limit: 20,
                current: 20,
                ..
            })
        ));
        assert_eq!(service.get_interests("u1").await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_existing_tag_updates_weight_at_limit() {
        let (_, service) = setup().await;
        service.set_interests("u1", tags(20)).await.unwrap();

        let interests = service
            .add_interest("u1", InterestInput::new("TAG3", Some(0.25)))
            .await
            .unwrap();

        assert_eq!(interests.len(), 20);
        let tag3 = interests.iter().find(|i| i.tag == "tag3").unwrap();
        assert!((tag3.weight - 0.25).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_bulk_replace_rejects_case_duplicates() {
        let (_, service) = setup().await;
        service
            .set_interests("u1", vec![InterestInput::new("chess", None)])
            .await
            .unwrap();

        let result = service
            .set_interests(
                "u1",
                vec![
                    InterestInput::new("Yoga", None),
                    InterestInput::new("yoga", None),
                ],
            )
            .await;

        assert!(matches!(result, Err(AppError::Duplicate { .. })));
        let interests = service.get_interests("u1").await.unwrap();
        assert_eq!(interests, vec![Interest { tag: "chess".to_string(), weight: 1.0 }]);
    }

    #[tokio::test]
    async fn test_bulk_replace_rejects_oversized_batch() {
        let (_, service) = setup().await;
        let result = service.set_interests("u1", tags(21)).await;
        assert!(matches!(result, Err(AppError::LimitExceeded { current: 21, .. })));
    }

    #[tokio::test]
    async fn test_weight_out_of_range() {
        let (_, service) = setup().await;
        let result = service
            .add_interest("u1", InterestInput::new("chess", Some(1.5)))
            .await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_remove_ignores_case() {
        let (_, service) = setup().await;
        service
            .add_interest("u1", InterestInput::new("Chess", None))
            .await
            .unwrap();

        let interests = service.remove_interest("u1", "chess").await.unwrap();
        assert!(interests.is_empty());

        let result = service.remove_interest("u1", "chess").await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_change_invalidates_cached_interests() {
        let (cache_store, service) = setup().await;
        service.get_interests("u1").await.unwrap();
        assert!(cache_store.contains("user_interests:u1").await);

        service
            .add_interest("u1", InterestInput::new("chess", None))
            .await
            .unwrap();

        assert!(!cache_store.contains("user_interests:u1").await);
        assert_eq!(service.get_interests("u1").await.unwrap().len(), 1);
    }
}
