//! User search and presence.

use profile_common::{AppError, AppResult};
use profile_db::entities::user::{self, ModerationStatus};
use serde::Serialize;
use tracing::debug;

use super::store::SharedProfileStore;
use super::trust::trust_score;

const MAX_SEARCH_LIMIT: u64 = 50;
const MAX_QUERY_LEN: usize = 100;

/// Search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub main_photo_url: Option<String>,
    pub is_captain: bool,
    pub is_verified: bool,
    pub trust_score: f64,
}

impl From<user::Model> for UserSummary {
    fn from(user: user::Model) -> Self {
        let main_photo_url = user
            .main_photo_url
            .filter(|_| user.main_photo_moderation_status == ModerationStatus::Approved);
        Self {
            trust_score: trust_score(
                user.verification_count,
                user.no_show_count,
                user.activities_attended_count,
            ),
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            main_photo_url,
            is_captain: user.is_captain,
            is_verified: user.is_verified,
        }
    }
}

#[derive(Clone)]
pub struct SearchService {
    store: SharedProfileStore,
}

impl SearchService {
    /// Create a new search service.
    #[must_use]
    pub const fn new(store: SharedProfileStore) -> Self {
        Self { store }
    }

    /// Find active users by username or name, hiding the viewer and anyone
    /// blocked in either direction.
    pub async fn search_users(
        &self,
        query: &str,
        viewer_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<UserSummary>> {
        let query = query.trim();
        if query.is_empty() || query.chars().count() > MAX_QUERY_LEN {
            return Err(AppError::validation(
                "q",
                format!("must be 1-{MAX_QUERY_LEN} characters"),
            ));
        }

        let users = self
            .store
            .search_users(query, viewer_id, limit.clamp(1, MAX_SEARCH_LIMIT), offset)
            .await?;
        debug!(viewer_id = %viewer_id, hits = users.len(), "User search");

        Ok(users.into_iter().map(UserSummary::from).collect())
    }

    /// Mark the user as seen now. The profile cache is left alone, so
    /// `last_seen_at` may lag by up to the profile TTL.
    pub async fn heartbeat(&self, user_id: &str) -> AppResult<()> {
        if self.store.touch_last_seen(user_id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("User"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::store::MemoryProfileStore;
    use profile_db::entities::user::UserStatus;
    use profile_db::test_utils::user_fixture;
    use std::sync::Arc;

    async fn setup() -> (Arc<MemoryProfileStore>, SearchService) {
        let store = Arc::new(MemoryProfileStore::new());
        for (id, name) in [("u1", "alice"), ("u2", "alina"), ("u3", "alfred"), ("u4", "bob")] {
            store.insert_user(user_fixture(id, name)).await;
        }
        (store.clone(), SearchService::new(store))
    }

    #[tokio::test]
    async fn test_search_excludes_viewer_blocked_and_banned() {
        let (store, service) = setup().await;
        store.block("u3", "u1").await;
        let mut banned = store.user("u2").await.unwrap();
        banned.status = UserStatus::Banned;
        store.insert_user(banned).await;
        store.insert_user(user_fixture("u5", "ALBERT")).await;

        let hits = service.search_users("al", "u1", 20, 0).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();

        assert_eq!(ids, vec!["u5"]);
    }

    #[tokio::test]
    async fn test_blank_query_rejected() {
        let (_, service) = setup().await;
        let result = service.search_users("   ", "u1", 20, 0).await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_heartbeat() {
        let (store, service) = setup().await;
        service.heartbeat("u1").await.unwrap();

        assert!(store.user("u1").await.unwrap().last_seen_at.is_some());
        assert!(matches!(
            service.heartbeat("missing").await,
            Err(AppError::NotFound { .. })
        ));
    }
}
