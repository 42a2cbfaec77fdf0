//! Subscription tier and captain status.

use chrono::{DateTime, FixedOffset, Utc};
use profile_common::{AppError, AppResult};
use profile_db::entities::user::{self, SubscriptionLevel};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::cache::ProfileCache;
use super::principal::Principal;
use super::store::SharedProfileStore;

/// Subscription and captain state of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionInfo {
    pub user_id: String,
    pub subscription_level: SubscriptionLevel,
    pub subscription_expires_at: Option<DateTime<FixedOffset>>,
    pub is_captain: bool,
    pub captain_since: Option<DateTime<FixedOffset>>,
}

impl From<user::Model> for SubscriptionInfo {
    fn from(user: user::Model) -> Self {
        Self {
            user_id: user.id,
            subscription_level: user.subscription_level,
            subscription_expires_at: user.subscription_expires_at,
            is_captain: user.is_captain,
            captain_since: user.captain_since,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionUpdate {
    pub level: SubscriptionLevel,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct SubscriptionService {
    store: SharedProfileStore,
    cache: ProfileCache,
}

impl SubscriptionService {
    /// Create a new subscription service.
    #[must_use]
    pub const fn new(store: SharedProfileStore, cache: ProfileCache) -> Self {
        Self { store, cache }
    }

    pub async fn get_subscription(&self, user_id: &str) -> AppResult<SubscriptionInfo> {
        Ok(self.store.get_live_user(user_id).await?.into())
    }

    /// Change the tier. The free tier never carries an expiry.
    pub async fn update_subscription(
        &self,
        admin: &Principal,
        user_id: &str,
        update: SubscriptionUpdate,
    ) -> AppResult<SubscriptionInfo> {
        admin.require_admin()?;

        let now = Utc::now();
        let expires_at = match (update.level, update.expires_at) {
            (SubscriptionLevel::Free, _) => None,
            (_, Some(at)) if at <= now => {
                return Err(AppError::validation(
                    "expires_at",
                    "subscription expiry must be in the future",
                ));
            }
            (_, at) => at.map(|at| at.fixed_offset()),
        };

        self.store.get_live_user(user_id).await?;
        let updated = self
            .store
            .update_user(user::ActiveModel {
                id: Set(user_id.to_string()),
                subscription_level: Set(update.level),
                subscription_expires_at: Set(expires_at),
                updated_at: Set(Some(now.into())),
                ..Default::default()
            })
            .await?;

        self.cache.invalidate_all(user_id).await;
        info!(
            user_id = %user_id,
            admin_id = %admin.user_id,
            level = ?updated.subscription_level,
            "Subscription updated"
        );

        Ok(updated.into())
    }

    /// Grant or revoke captain status.
    pub async fn set_captain_status(
        &self,
        admin: &Principal,
        user_id: &str,
        is_captain: bool,
    ) -> AppResult<SubscriptionInfo> {
        admin.require_admin()?;
        let current = self.store.get_live_user(user_id).await?;

        let now = Utc::now();
        let captain_since = match (is_captain, current.captain_since) {
            (false, _) => None,
            (true, Some(since)) if current.is_captain => Some(since),
            (true, _) => Some(now.into()),
        };

        let updated = self
            .store
            .update_user(user::ActiveModel {
                id: Set(user_id.to_string()),
                is_captain: Set(is_captain),
                captain_since: Set(captain_since),
                updated_at: Set(Some(now.into())),
                ..Default::default()
            })
            .await?;

        self.cache.invalidate_all(user_id).await;
        info!(user_id = %user_id, admin_id = %admin.user_id, is_captain, "Captain status changed");

        Ok(updated.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::principal::Role;
    use crate::services::store::MemoryProfileStore;
    use chrono::Duration;
    use profile_db::test_utils::user_fixture;
    use std::sync::Arc;

    async fn setup() -> SubscriptionService {
        let store = Arc::new(MemoryProfileStore::new());
        store.insert_user(user_fixture("u1", "alice")).await;
        SubscriptionService::new(store, ProfileCache::disabled())
    }

    fn admin() -> Principal {
        Principal::user("admin").with_role(Role::Admin)
    }

    #[tokio::test]
    async fn test_upgrade_with_expiry() {
        let service = setup().await;
        let info = service
            .update_subscription(
                &admin(),
                "u1",
                SubscriptionUpdate {
                    level: SubscriptionLevel::Premium,
                    expires_at: Some(Utc::now() + Duration::days(30)),
                },
            )
            .await
            .unwrap();

        assert_eq!(info.subscription_level, SubscriptionLevel::Premium);
        assert!(info.subscription_expires_at.is_some());
    }

    #[tokio::test]
    async fn test_free_clears_expiry() {
        let service = setup().await;
        let info = service
            .update_subscription(
                &admin(),
                "u1",
                SubscriptionUpdate {
                    level: SubscriptionLevel::Free,
                    expires_at: Some(Utc::now() + Duration::days(30)),
                },
            )
            .await
            .unwrap();

        assert!(info.subscription_expires_at.is_none());
    }

    #[tokio::test]
    async fn test_past_expiry_rejected() {
        let service = setup().await;
        let result = service
            .update_subscription(
                &admin(),
                "u1",
                SubscriptionUpdate {
                    level: SubscriptionLevel::Club,
                    expires_at: Some(Utc::now() - Duration::days(1)),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_moderator_is_not_admin() {
        let service = setup().await;
        let result = service
            .set_captain_status(&Principal::user("m").with_role(Role::Moderator), "u1", true)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_captain_grant_and_revoke() {
        let service = setup().await;
        let granted = service.set_captain_status(&admin(), "u1", true).await.unwrap();
        assert!(granted.is_captain);
        assert!(granted.captain_since.is_some());

        let again = service.set_captain_status(&admin(), "u1", true).await.unwrap();
        assert_eq!(again.captain_since, granted.captain_since);

        let revoked = service.set_captain_status(&admin(), "u1", false).await.unwrap();
        assert!(!revoked.is_captain);
        assert!(revoked.captain_since.is_none());
    }
}
