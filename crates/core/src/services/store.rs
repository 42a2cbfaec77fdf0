//! Row store contract consumed by the profile services.
//!
//! [`ProfileStore`] is the narrow view of persistence the services need:
//! point reads and writes of a user row, dependent rows filtered by user id,
//! the case-insensitive username check and the block relation.
//! [`DatabaseProfileStore`] implements it over the sea-orm repositories.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use profile_common::{AppError, AppResult};
use profile_db::{
    entities::{profile_view, user, user_interest, user_settings},
    repositories::{
        CounterAdjustment, ProfileViewRepository, UserBlockRepository, UserInterestRepository,
        UserRepository, UserSettingsRepository,
    },
};
use sea_orm::DatabaseConnection;

/// Shared handle to a row store.
pub type SharedProfileStore = Arc<dyn ProfileStore>;

/// Persistence operations used by the profile services.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Point read of a user row, including soft-deleted rows.
    async fn find_user(&self, user_id: &str) -> AppResult<Option<user::Model>>;

    /// Write the `Set` fields of a live user row. A missing or soft-deleted
    /// row is `NotFound`; a username taken in the meantime is `Duplicate`.
    async fn update_user(&self, model: user::ActiveModel) -> AppResult<user::Model>;

    /// Whether any user holds this username, compared case-insensitively.
    async fn username_exists(&self, username: &str) -> AppResult<bool>;

    /// Apply counter deltas atomically. `None` if no live user matched.
    async fn adjust_counters(
        &self,
        user_id: &str,
        adjustment: CounterAdjustment,
    ) -> AppResult<Option<user::Model>>;

    /// Update `last_seen_at`. Returns false if no live user matched.
    async fn touch_last_seen(&self, user_id: &str) -> AppResult<bool>;

    /// Write the anonymized user row and delete its interests and settings
    /// in one transaction.
    async fn soft_delete_user(&self, model: user::ActiveModel) -> AppResult<user::Model>;

    /// Users whose main photo awaits moderation.
    async fn find_pending_photo_moderations(
        &self,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<user::Model>>;

    /// Active users matching `query`, excluding the viewer and anyone blocked
    /// in either direction.
    async fn search_users(
        &self,
        query: &str,
        viewer_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<user::Model>>;

    /// Settings row of a user, if created.
    async fn find_settings(&self, user_id: &str) -> AppResult<Option<user_settings::Model>>;

    /// Insert a settings row.
    async fn create_settings(
        &self,
        model: user_settings::Model,
    ) -> AppResult<user_settings::Model>;

    /// Write the `Set` fields of a settings row.
    async fn update_settings(
        &self,
        model: user_settings::ActiveModel,
    ) -> AppResult<user_settings::Model>;

    /// Interests of a user, strongest first.
    async fn find_interests(&self, user_id: &str) -> AppResult<Vec<user_interest::Model>>;

    /// Replace every interest of a user in one transaction.
    async fn replace_interests(
        &self,
        user_id: &str,
        interests: Vec<user_interest::Model>,
    ) -> AppResult<()>;

    /// Insert an interest or update the weight of the same tag.
    async fn upsert_interest(&self, model: user_interest::Model) -> AppResult<()>;

    /// Delete one interest. Returns whether it existed.
    async fn delete_interest(&self, user_id: &str, tag: &str) -> AppResult<bool>;

    /// Whether a block exists in either direction between two users.
    async fn is_blocked_between(&self, user_a: &str, user_b: &str) -> AppResult<bool>;

    /// Append a profile-view record.
    async fn record_profile_view(&self, model: profile_view::Model) -> AppResult<()>;

    /// Check that the store answers queries.
    async fn ping(&self) -> AppResult<()>;

    /// Load a user that exists and has not been soft-deleted.
    async fn get_live_user(&self, user_id: &str) -> AppResult<user::Model> {
        match self.find_user(user_id).await? {
            Some(user) if !user.is_deleted() => Ok(user),
            _ => Err(AppError::not_found("User")),
        }
    }
}

/// [`ProfileStore`] backed by `PostgreSQL` through the repositories.
#[derive(Clone)]
pub struct DatabaseProfileStore {
    db: Arc<DatabaseConnection>,
    user_repo: UserRepository,
    settings_repo: UserSettingsRepository,
    interest_repo: UserInterestRepository,
    block_repo: UserBlockRepository,
    view_repo: ProfileViewRepository,
}

impl DatabaseProfileStore {
    /// Create a new store over a shared connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            user_repo: UserRepository::new(Arc::clone(&db)),
            settings_repo: UserSettingsRepository::new(Arc::clone(&db)),
            interest_repo: UserInterestRepository::new(Arc::clone(&db)),
            block_repo: UserBlockRepository::new(Arc::clone(&db)),
            view_repo: ProfileViewRepository::new(Arc::clone(&db)),
            db,
        }
    }
}

#[async_trait]
impl ProfileStore for DatabaseProfileStore {
    async fn find_user(&self, user_id: &str) -> AppResult<Option<user::Model>> {
        self.user_repo.find_by_id(user_id).await
    }

    async fn update_user(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        self.user_repo.update(model).await
    }

    async fn username_exists(&self, username: &str) -> AppResult<bool> {
        self.user_repo.username_exists(username).await
    }

    async fn adjust_counters(
        &self,
        user_id: &str,
        adjustment: CounterAdjustment,
    ) -> AppResult<Option<user::Model>> {
        self.user_repo
            .adjust_counters(user_id, adjustment, Utc::now().into())
            .await
    }

    async fn touch_last_seen(&self, user_id: &str) -> AppResult<bool> {
        self.user_repo
            .touch_last_seen(user_id, Utc::now().into())
            .await
    }

    async fn soft_delete_user(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        self.user_repo.soft_delete(model).await
    }

    async fn find_pending_photo_moderations(
        &self,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<user::Model>> {
        self.user_repo
            .find_pending_photo_moderations(limit, offset)
            .await
    }

    async fn search_users(
        &self,
        query: &str,
        viewer_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<user::Model>> {
        self.user_repo
            .search(query, viewer_id, limit, offset, Utc::now().into())
            .await
    }

    async fn find_settings(&self, user_id: &str) -> AppResult<Option<user_settings::Model>> {
        self.settings_repo.find_by_user_id(user_id).await
    }

    async fn create_settings(
        &self,
        model: user_settings::Model,
    ) -> AppResult<user_settings::Model> {
        self.settings_repo.create(model).await
    }

    async fn update_settings(
        &self,
        model: user_settings::ActiveModel,
    ) -> AppResult<user_settings::Model> {
        self.settings_repo.update(model).await
    }

    async fn find_interests(&self, user_id: &str) -> AppResult<Vec<user_interest::Model>> {
        self.interest_repo.find_by_user_id(user_id).await
    }

    async fn replace_interests(
        &self,
        user_id: &str,
        interests: Vec<user_interest::Model>,
    ) -> AppResult<()> {
        self.interest_repo.replace_all(user_id, interests).await
    }

    async fn upsert_interest(&self, model: user_interest::Model) -> AppResult<()> {
        self.interest_repo.upsert(model).await
    }

    async fn delete_interest(&self, user_id: &str, tag: &str) -> AppResult<bool> {
        self.interest_repo.delete(user_id, tag).await
    }

    async fn is_blocked_between(&self, user_a: &str, user_b: &str) -> AppResult<bool> {
        self.block_repo.is_blocked_between(user_a, user_b).await
    }

    async fn record_profile_view(&self, model: profile_view::Model) -> AppResult<()> {
        self.view_repo.create(model).await
    }

    async fn ping(&self) -> AppResult<()> {
        profile_db::ping(&self.db).await
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryProfileStore;

#[cfg(any(test, feature = "test-utils"))]
mod memory {
    use super::{AppError, AppResult, CounterAdjustment, ProfileStore, Utc, async_trait};
    use profile_db::entities::{profile_view, user, user_interest, user_settings};
    use sea_orm::{ActiveModelTrait, ActiveValue, EntityTrait, Iterable, TryIntoModel};
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct State {
        users: HashMap<String, user::Model>,
        settings: HashMap<String, user_settings::Model>,
        interests: HashMap<String, Vec<user_interest::Model>>,
        blocks: HashSet<(String, String)>,
        views: Vec<profile_view::Model>,
    }

    /// In-process [`ProfileStore`] for tests.
    ///
    /// Partial updates apply only the `Set` fields of an active model, the way
    /// an `UPDATE` would.
    #[derive(Default)]
    pub struct MemoryProfileStore {
        state: RwLock<State>,
        fail_view_writes: AtomicBool,
    }

    fn merge<A: ActiveModelTrait>(mut current: A, patch: &A) -> A {
        for column in <A::Entity as EntityTrait>::Column::iter() {
            if let ActiveValue::Set(value) = patch.get(column) {
                current.set(column, value);
            }
        }
        current
    }

    fn to_db_error(err: sea_orm::DbErr) -> AppError {
        AppError::Database(err.to_string())
    }

    impl MemoryProfileStore {
        /// Create an empty store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Insert or overwrite a user row.
        pub async fn insert_user(&self, model: user::Model) {
            self.state
                .write()
                .await
                .users
                .insert(model.id.clone(), model);
        }

        /// Read a user row directly.
        pub async fn user(&self, user_id: &str) -> Option<user::Model> {
            self.state.read().await.users.get(user_id).cloned()
        }

        /// Create a block from `blocker_id` to `blocked_id`.
        pub async fn block(&self, blocker_id: &str, blocked_id: &str) {
            self.state
                .write()
                .await
                .blocks
                .insert((blocker_id.to_string(), blocked_id.to_string()));
        }

        /// Every recorded profile view.
        pub async fn profile_views(&self) -> Vec<profile_view::Model> {
            self.state.read().await.views.clone()
        }

        /// Make profile-view writes fail (or succeed again).
        pub fn fail_profile_views(&self, fail: bool) {
            self.fail_view_writes.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ProfileStore for MemoryProfileStore {
        async fn find_user(&self, user_id: &str) -> AppResult<Option<user::Model>> {
            Ok(self.user(user_id).await)
        }

        async fn update_user(&self, model: user::ActiveModel) -> AppResult<user::Model> {
            let id = match &model.id {
                ActiveValue::Set(v) | ActiveValue::Unchanged(v) => v.clone(),
                ActiveValue::NotSet => return Err(AppError::Database("missing id".into())),
            };

            let mut state = self.state.write().await;
            let current = state
                .users
                .get(&id)
                .filter(|u| !u.is_deleted())
                .cloned()
                .ok_or_else(|| AppError::not_found("User"))?;

            let updated = merge(user::ActiveModel::from(current), &model)
                .try_into_model()
                .map_err(to_db_error)?;

            let taken = state
                .users
                .values()
                .any(|u| u.id != updated.id && u.username_lower == updated.username_lower);
            if taken {
                return Err(AppError::duplicate("username", updated.username));
            }

            state.users.insert(id, updated.clone());
            Ok(updated)
        }

        async fn username_exists(&self, username: &str) -> AppResult<bool> {
            let lower = username.to_lowercase();
            Ok(self
                .state
                .read()
                .await
                .users
                .values()
                .any(|u| u.username_lower == lower))
        }

        async fn adjust_counters(
            &self,
            user_id: &str,
            adjustment: CounterAdjustment,
        ) -> AppResult<Option<user::Model>> {
            let mut state = self.state.write().await;
            let Some(user) = state.users.get_mut(user_id).filter(|u| !u.is_deleted()) else {
                return Ok(None);
            };
            user.verification_count = (user.verification_count + adjustment.verification).max(0);
            user.no_show_count = (user.no_show_count + adjustment.no_show).max(0);
            user.activities_attended_count =
                (user.activities_attended_count + adjustment.attended).max(0);
            user.activities_created_count =
                (user.activities_created_count + adjustment.created).max(0);
            user.updated_at = Some(Utc::now().into());
            Ok(Some(user.clone()))
        }

        async fn touch_last_seen(&self, user_id: &str) -> AppResult<bool> {
            let mut state = self.state.write().await;
            match state.users.get_mut(user_id) {
                Some(user) if !user.is_deleted() => {
                    user.last_seen_at = Some(Utc::now().into());
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn soft_delete_user(&self, model: user::ActiveModel) -> AppResult<user::Model> {
            let updated = self.update_user(model).await?;
            let mut state = self.state.write().await;
            state.interests.remove(&updated.id);
            state.settings.remove(&updated.id);
            Ok(updated)
        }

        async fn find_pending_photo_moderations(
            &self,
            limit: u64,
            offset: u64,
        ) -> AppResult<Vec<user::Model>> {
            let state = self.state.read().await;
            let mut pending: Vec<user::Model> = state
                .users
                .values()
                .filter(|u| {
                    u.main_photo_url.is_some()
                        && u.main_photo_moderation_status == user::ModerationStatus::Pending
                        && !u.is_deleted()
                })
                .cloned()
                .collect();
            pending.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)));
            Ok(pending
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        }

        async fn search_users(
            &self,
            query: &str,
            viewer_id: &str,
            limit: u64,
            offset: u64,
        ) -> AppResult<Vec<user::Model>> {
            let needle = query.to_lowercase();
            let now = Utc::now();
            let state = self.state.read().await;
            let blocked = |id: &str| {
                state
                    .blocks
                    .contains(&(viewer_id.to_string(), id.to_string()))
                    || state
                        .blocks
                        .contains(&(id.to_string(), viewer_id.to_string()))
            };
            let matches = |value: Option<&String>| {
                value.is_some_and(|v| v.to_lowercase().contains(&needle))
            };

            let mut found: Vec<user::Model> = state
                .users
                .values()
                .filter(|u| {
                    let active = match u.status {
                        user::UserStatus::Active => true,
                        user::UserStatus::TemporaryBan => {
                            u.ban_expires_at.is_some_and(|at| at <= now)
                        }
                        user::UserStatus::Banned => false,
                    };
                    active
                        && !u.is_deleted()
                        && u.id != viewer_id
                        && !blocked(&u.id)
                        && (u.username_lower.contains(&needle)
                            || matches(u.first_name.as_ref())
                            || matches(u.last_name.as_ref()))
                })
                .cloned()
                .collect();
            found.sort_by(|a, b| a.username_lower.cmp(&b.username_lower));
            Ok(found
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        }

        async fn find_settings(&self, user_id: &str) -> AppResult<Option<user_settings::Model>> {
            Ok(self.state.read().await.settings.get(user_id).cloned())
        }

        async fn create_settings(
            &self,
            model: user_settings::Model,
        ) -> AppResult<user_settings::Model> {
            let mut state = self.state.write().await;
            if state.settings.contains_key(&model.user_id) {
                return Err(AppError::Database(
                    "duplicate key value violates unique constraint".into(),
                ));
            }
            state.settings.insert(model.user_id.clone(), model.clone());
            Ok(model)
        }

        async fn update_settings(
            &self,
            model: user_settings::ActiveModel,
        ) -> AppResult<user_settings::Model> {
            let id = match &model.user_id {
                ActiveValue::Set(v) | ActiveValue::Unchanged(v) => v.clone(),
                ActiveValue::NotSet => return Err(AppError::Database("missing id".into())),
            };
            let mut state = self.state.write().await;
            let current = state
                .settings
                .get(&id)
                .cloned()
                .ok_or_else(|| AppError::Database("None of the records are updated".into()))?;
            let updated = merge(user_settings::ActiveModel::from(current), &model)
                .try_into_model()
                .map_err(to_db_error)?;
            state.settings.insert(id, updated.clone());
            Ok(updated)
        }

        async fn find_interests(&self, user_id: &str) -> AppResult<Vec<user_interest::Model>> {
            let mut interests = self
                .state
                .read()
                .await
                .interests
                .get(user_id)
                .cloned()
                .unwrap_or_default();
            interests.sort_by(|a, b| {
                b.weight
                    .total_cmp(&a.weight)
                    .then_with(|| a.interest_tag.cmp(&b.interest_tag))
            });
            Ok(interests)
        }

        async fn replace_interests(
            &self,
            user_id: &str,
            interests: Vec<user_interest::Model>,
        ) -> AppResult<()> {
            self.state
                .write()
                .await
                .interests
                .insert(user_id.to_string(), interests);
            Ok(())
        }

        async fn upsert_interest(&self, model: user_interest::Model) -> AppResult<()> {
            let mut state = self.state.write().await;
            let interests = state.interests.entry(model.user_id.clone()).or_default();
            if let Some(existing) = interests
                .iter_mut()
                .find(|i| i.interest_tag == model.interest_tag)
            {
                existing.weight = model.weight;
            } else {
                interests.push(model);
            }
            Ok(())
        }

        async fn delete_interest(&self, user_id: &str, tag: &str) -> AppResult<bool> {
            let mut state = self.state.write().await;
            let Some(interests) = state.interests.get_mut(user_id) else {
                return Ok(false);
            };
            let before = interests.len();
            interests.retain(|i| i.interest_tag != tag);
            Ok(interests.len() != before)
        }

        async fn is_blocked_between(&self, user_a: &str, user_b: &str) -> AppResult<bool> {
            let state = self.state.read().await;
            Ok(state
                .blocks
                .contains(&(user_a.to_string(), user_b.to_string()))
                || state
                    .blocks
                    .contains(&(user_b.to_string(), user_a.to_string())))
        }

        async fn record_profile_view(&self, model: profile_view::Model) -> AppResult<()> {
            if self.fail_view_writes.load(Ordering::SeqCst) {
                return Err(AppError::Database("connection reset by peer".into()));
            }
            self.state.write().await.views.push(model);
            Ok(())
        }

        async fn ping(&self) -> AppResult<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use profile_db::test_utils::user_fixture;
    use sea_orm::Set;

    #[tokio::test]
    async fn test_update_never_touches_deleted_row() {
        let store = MemoryProfileStore::new();
        let mut deleted = user_fixture("u1", "deleted_1_alice");
        deleted.status = user::UserStatus::Banned;
        deleted.deleted_at = Some(Utc::now().into());
        store.insert_user(deleted.clone()).await;

        let result = store
            .update_user(user::ActiveModel {
                id: Set("u1".to_string()),
                status: Set(user::UserStatus::TemporaryBan),
                ban_reason: Set(Some("spam".to_string())),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
        assert_eq!(store.user("u1").await.unwrap(), deleted);
        assert!(
            store
                .adjust_counters(
                    "u1",
                    CounterAdjustment {
                        no_show: 1,
                        ..Default::default()
                    }
                )
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_username_race_is_duplicate_naming_field() {
        let store = MemoryProfileStore::new();
        store.insert_user(user_fixture("u1", "alice")).await;
        store.insert_user(user_fixture("u2", "bob")).await;

        let result = store
            .update_user(user::ActiveModel {
                id: Set("u2".to_string()),
                username: Set("Alice".to_string()),
                username_lower: Set("alice".to_string()),
                ..Default::default()
            })
            .await;

        match result {
            Err(AppError::Duplicate { field, value }) => {
                assert_eq!(field, "username");
                assert_eq!(value, "Alice");
            }
            other => panic!("expected duplicate, got {other:?}"),
        }
    }
}
