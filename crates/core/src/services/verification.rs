//! Verification and activity counters.

use profile_common::{AppError, AppResult};
use profile_db::{entities::user, repositories::CounterAdjustment};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::cache::{ProfileCache, ResourceType};
use super::principal::Principal;
use super::store::SharedProfileStore;
use super::trust::{no_show_warning, trust_score};

/// Counters of a user with the derived trust score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationMetrics {
    pub user_id: String,
    pub verification_count: i32,
    pub no_show_count: i32,
    pub activities_attended_count: i32,
    pub activities_created_count: i32,
    pub is_verified: bool,
    pub trust_score: f64,
    /// Set once the no-show count reaches the ban threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<user::Model> for VerificationMetrics {
    fn from(user: user::Model) -> Self {
        Self {
            trust_score: trust_score(
                user.verification_count,
                user.no_show_count,
                user.activities_attended_count,
            ),
            user_id: user.id,
            verification_count: user.verification_count,
            no_show_count: user.no_show_count,
            activities_attended_count: user.activities_attended_count,
            activities_created_count: user.activities_created_count,
            is_verified: user.is_verified,
            warning: None,
        }
    }
}

/// Signed deltas for the activity counters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ActivityCounterDelta {
    #[serde(default)]
    pub attended: i32,
    #[serde(default)]
    pub created: i32,
}

#[derive(Clone)]
pub struct VerificationService {
    store: SharedProfileStore,
    cache: ProfileCache,
}

impl VerificationService {
    /// Create a new verification service.
    #[must_use]
    pub const fn new(store: SharedProfileStore, cache: ProfileCache) -> Self {
        Self { store, cache }
    }

    /// Metrics of another user, for moderators.
    pub async fn get_metrics(&self, actor: &Principal, user_id: &str) -> AppResult<VerificationMetrics> {
        actor.require_moderator()?;
        self.get_own_metrics(user_id).await
    }

    /// Metrics of the calling user.
    pub async fn get_own_metrics(&self, user_id: &str) -> AppResult<VerificationMetrics> {
        let user = self.store.get_live_user(user_id).await?;
        Ok(user.into())
    }

    /// Count one more peer verification.
    pub async fn increment_verification(
        &self,
        actor: &Principal,
        user_id: &str,
    ) -> AppResult<VerificationMetrics> {
        let user = self
            .adjust(
                actor,
                user_id,
                CounterAdjustment {
                    verification: 1,
                    ..Default::default()
                },
            )
            .await?;
        info!(user_id = %user_id, count = user.verification_count, "Verification recorded");
        Ok(user.into())
    }

    /// Count one more no-show. The result carries a warning at the ban
    /// threshold; the ban itself is left to a moderator.
    pub async fn increment_no_show(
        &self,
        actor: &Principal,
        user_id: &str,
    ) -> AppResult<VerificationMetrics> {
        let user = self
            .adjust(
                actor,
                user_id,
                CounterAdjustment {
                    no_show: 1,
                    ..Default::default()
                },
            )
            .await?;

        let warning = no_show_warning(user.no_show_count);
        if let Some(message) = &warning {
            warn!(user_id = %user_id, count = user.no_show_count, "{message}");
        } else {
            info!(user_id = %user_id, count = user.no_show_count, "No-show recorded");
        }

        Ok(VerificationMetrics {
            warning,
            ..user.into()
        })
    }

    /// Apply signed deltas to the activity counters. Counters never go
    /// below zero.
    pub async fn update_activity_counters(
        &self,
        actor: &Principal,
        user_id: &str,
        delta: ActivityCounterDelta,
    ) -> AppResult<VerificationMetrics> {
        let adjustment = CounterAdjustment {
            attended: delta.attended,
            created: delta.created,
            ..Default::default()
        };
        if adjustment.is_empty() {
            actor.require_moderator()?;
            return Ok(self.store.get_live_user(user_id).await?.into());
        }

        let user = self.adjust(actor, user_id, adjustment).await?;
        info!(
            user_id = %user_id,
            attended = user.activities_attended_count,
            created = user.activities_created_count,
            "Activity counters updated"
        );
        Ok(user.into())
    }

    async fn adjust(
        &self,
        actor: &Principal,
        user_id: &str,
        adjustment: CounterAdjustment,
    ) -> AppResult<user::Model> {
        actor.require_moderator()?;
        self.store.get_live_user(user_id).await?;

        let user = self
            .store
            .adjust_counters(user_id, adjustment)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        self.cache.invalidate(ResourceType::Profile, user_id).await;
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::principal::Role;
    use crate::services::store::MemoryProfileStore;
    use crate::services::trust::NO_SHOW_BAN_THRESHOLD;
    use profile_db::entities::user::UserStatus;
    use profile_db::test_utils::user_fixture;
    use std::sync::Arc;

    async fn setup() -> (Arc<MemoryProfileStore>, VerificationService) {
        let store = Arc::new(MemoryProfileStore::new());
        store.insert_user(user_fixture("u1", "alice")).await;
        let service = VerificationService::new(store.clone(), ProfileCache::disabled());
        (store, service)
    }

    fn moderator() -> Principal {
        Principal::user("mod").with_role(Role::Moderator)
    }

    #[tokio::test]
    async fn test_fifth_no_show_warns_without_banning() {
        let (store, service) = setup().await;
        for _ in 1..NO_SHOW_BAN_THRESHOLD {
            let metrics = service.increment_no_show(&moderator(), "u1").await.unwrap();
            assert!(metrics.warning.is_none());
        }

        let metrics = service.increment_no_show(&moderator(), "u1").await.unwrap();

        assert_eq!(metrics.no_show_count, 5);
        assert!((metrics.trust_score - 0.0).abs() < f64::EPSILON);
        assert_eq!(
            metrics.warning.as_deref(),
            Some("User now has 5 no-shows. Threshold for automatic ban is 5.")
        );
        assert_eq!(store.user("u1").await.unwrap().status, UserStatus::Active);
    }

    #[tokio::test]
    async fn test_verification_raises_score() {
        let (_, service) = setup().await;
        let metrics = service
            .increment_verification(&moderator(), "u1")
            .await
            .unwrap();

        assert_eq!(metrics.verification_count, 1);
        assert!((metrics.trust_score - 10.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_activity_counters_floor_at_zero() {
        let (_, service) = setup().await;
        service
            .update_activity_counters(
                &moderator(),
                "u1",
                ActivityCounterDelta {
                    attended: 3,
                    created: 1,
                },
            )
            .await
            .unwrap();

        let metrics = service
            .update_activity_counters(
                &moderator(),
                "u1",
                ActivityCounterDelta {
                    attended: -10,
                    created: 0,
                },
            )
            .await
            .unwrap();

        assert_eq!(metrics.activities_attended_count, 0);
        assert_eq!(metrics.activities_created_count, 1);
    }

    #[tokio::test]
    async fn test_user_reads_own_metrics_without_role() {
        let (_, service) = setup().await;
        service
            .increment_verification(&moderator(), "u1")
            .await
            .unwrap();

        let metrics = service.get_own_metrics("u1").await.unwrap();
        assert_eq!(metrics.user_id, "u1");
        assert_eq!(metrics.verification_count, 1);

        let result = service.get_metrics(&Principal::user("u1"), "u1").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_regular_user_cannot_adjust() {
        let (_, service) = setup().await;
        let result = service
            .increment_verification(&Principal::user("u2"), "u1")
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
