//! Profile orchestration.
//!
//! Reads check visibility first, then the profile cache, then storage.
//! Writes commit to storage first and invalidate the cache afterwards; a
//! failed invalidation is logged by the cache and never undoes the write.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use profile_common::{AppError, AppResult};
use profile_db::entities::{
    user::{self, ModerationStatus, SubscriptionLevel, UserStatus},
    user_settings,
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

use super::cache::{ProfileCache, ResourceType};
use super::interest::Interest;
use super::moderation::effective_status;
use super::principal::Principal;
use super::store::SharedProfileStore;
use super::trust::trust_score;
use super::visibility::VisibilityFilter;

/// Text that must be sent back verbatim to delete an account.
pub const DELETE_CONFIRMATION: &str = "DELETE MY ACCOUNT";

const MIN_AGE_YEARS: u32 = 18;
const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 30;

/// Full profile as seen by its owner. This is what the profile cache holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_description: Option<String>,
    pub main_photo_url: Option<String>,
    pub main_photo_moderation_status: ModerationStatus,
    pub extra_photos: Vec<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub subscription_level: SubscriptionLevel,
    pub subscription_expires_at: Option<DateTime<FixedOffset>>,
    pub status: UserStatus,
    pub ban_expires_at: Option<DateTime<FixedOffset>>,
    pub ban_reason: Option<String>,
    pub is_captain: bool,
    pub captain_since: Option<DateTime<FixedOffset>>,
    pub verification_count: i32,
    pub no_show_count: i32,
    pub activities_attended_count: i32,
    pub activities_created_count: i32,
    pub is_verified: bool,
    pub trust_score: f64,
    pub last_seen_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
    pub settings: Option<user_settings::Model>,
    pub interests: Vec<Interest>,
}

impl ProfileSnapshot {
    fn build(
        user: user::Model,
        settings: Option<user_settings::Model>,
        interests: Vec<Interest>,
    ) -> Self {
        Self {
            trust_score: trust_score(
                user.verification_count,
                user.no_show_count,
                user.activities_attended_count,
            ),
            extra_photos: user.extra_photos(),
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_description: user.profile_description,
            main_photo_url: user.main_photo_url,
            main_photo_moderation_status: user.main_photo_moderation_status,
            date_of_birth: user.date_of_birth,
            gender: user.gender,
            subscription_level: user.subscription_level,
            subscription_expires_at: user.subscription_expires_at,
            status: user.status,
            ban_expires_at: user.ban_expires_at,
            ban_reason: user.ban_reason,
            is_captain: user.is_captain,
            captain_since: user.captain_since,
            verification_count: user.verification_count,
            no_show_count: user.no_show_count,
            activities_attended_count: user.activities_attended_count,
            activities_created_count: user.activities_created_count,
            is_verified: user.is_verified,
            last_seen_at: user.last_seen_at,
            created_at: user.created_at,
            settings,
            interests,
        }
    }

    /// Whether other users may currently see this profile.
    #[must_use]
    pub fn is_publicly_visible(&self, now: DateTime<Utc>) -> bool {
        effective_status(self.status, self.ban_expires_at, now) == UserStatus::Active
    }
}

/// Profile as seen by other users.
///
/// The main photo is shown only once approved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicProfile {
    pub id: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_description: Option<String>,
    pub main_photo_url: Option<String>,
    pub extra_photos: Vec<String>,
    pub gender: Option<String>,
    pub subscription_level: SubscriptionLevel,
    pub is_captain: bool,
    pub is_verified: bool,
    pub trust_score: f64,
    pub last_seen_at: Option<DateTime<FixedOffset>>,
    pub interests: Vec<Interest>,
}

impl From<ProfileSnapshot> for PublicProfile {
    fn from(s: ProfileSnapshot) -> Self {
        let main_photo_url = s
            .main_photo_url
            .filter(|_| s.main_photo_moderation_status == ModerationStatus::Approved);
        Self {
            id: s.id,
            username: s.username,
            first_name: s.first_name,
            last_name: s.last_name,
            profile_description: s.profile_description,
            main_photo_url,
            extra_photos: s.extra_photos,
            gender: s.gender,
            subscription_level: s.subscription_level,
            is_captain: s.is_captain,
            is_verified: s.is_verified,
            trust_score: s.trust_score,
            last_seen_at: s.last_seen_at,
            interests: s.interests,
        }
    }
}

/// Result of a profile read: the full snapshot for the owner, the public
/// projection for everyone else.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProfileView {
    Own(Box<ProfileSnapshot>),
    Public(Box<PublicProfile>),
}

/// Partial profile update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 5000))]
    pub profile_description: Option<String>,
    #[validate(length(max = 50))]
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

fn validate_date_of_birth(date_of_birth: NaiveDate, today: NaiveDate) -> AppResult<()> {
    match today.years_since(date_of_birth) {
        None => Err(AppError::validation(
            "date_of_birth",
            "cannot be in the future",
        )),
        Some(age) if age < MIN_AGE_YEARS => Err(AppError::validation(
            "date_of_birth",
            format!("must be at least {MIN_AGE_YEARS} years old"),
        )),
        Some(_) => Ok(()),
    }
}

fn validate_username(username: &str) -> AppResult<()> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(AppError::validation(
            "username",
            format!("must be {USERNAME_MIN_LEN}-{USERNAME_MAX_LEN} characters"),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::validation(
            "username",
            "may only contain letters, digits and underscores",
        ));
    }
    Ok(())
}

/// Anonymized form of an identity field. The timestamp prefix keeps the
/// result unique and out of reach of the username rules.
fn anonymize(value: &str, deleted_at: DateTime<Utc>) -> String {
    format!("deleted_{}_{value}", deleted_at.timestamp())
}

/// Composes visibility, cache and storage for profile reads and writes.
#[derive(Clone)]
pub struct ProfileService {
    store: SharedProfileStore,
    cache: ProfileCache,
    visibility: VisibilityFilter,
}

impl ProfileService {
    /// Create a new profile service.
    #[must_use]
    pub fn new(store: SharedProfileStore, cache: ProfileCache) -> Self {
        Self {
            visibility: VisibilityFilter::new(store.clone()),
            store,
            cache,
        }
    }

    /// Read a profile on behalf of `viewer_id`.
    ///
    /// A block, a deleted account or a ban all read as `NotFound` for other
    /// viewers. Owners see their own profile while banned.
    pub async fn get_profile(&self, subject_id: &str, viewer_id: &str) -> AppResult<ProfileView> {
        let own = subject_id == viewer_id;
        if !own && !self.visibility.is_visible(subject_id, viewer_id).await? {
            return Err(AppError::not_found("User"));
        }

        let snapshot = self.snapshot(subject_id).await?;
        if own {
            return Ok(ProfileView::Own(Box::new(snapshot)));
        }
        if !snapshot.is_publicly_visible(Utc::now()) {
            return Err(AppError::not_found("User"));
        }
        Ok(ProfileView::Public(Box::new(snapshot.into())))
    }

    /// Read another user's public profile and record the view.
    pub async fn get_public_profile(
        &self,
        subject_id: &str,
        viewer: &Principal,
    ) -> AppResult<ProfileView> {
        let view = self.get_profile(subject_id, &viewer.user_id).await?;
        self.visibility.record_view(viewer, subject_id).await;
        Ok(view)
    }

    /// Cached snapshot of a live user, loaded from storage on a miss.
    pub async fn snapshot(&self, user_id: &str) -> AppResult<ProfileSnapshot> {
        if let Some(cached) = self
            .cache
            .get::<ProfileSnapshot>(ResourceType::Profile, user_id)
            .await
        {
            return Ok(cached);
        }

        let snapshot = self.load_snapshot(user_id).await?;
        self.cache
            .set(ResourceType::Profile, user_id, &snapshot)
            .await;
        debug!(user_id = %user_id, "Profile snapshot rebuilt");
        Ok(snapshot)
    }

    /// Apply a partial update to the caller's own profile.
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> AppResult<ProfileSnapshot> {
        update.validate()?;
        let now = Utc::now();
        if let Some(date_of_birth) = update.date_of_birth {
            validate_date_of_birth(date_of_birth, now.date_naive())?;
        }

        self.store.get_live_user(user_id).await?;

        let mut model = user::ActiveModel {
            id: Set(user_id.to_string()),
            updated_at: Set(Some(now.into())),
            ..Default::default()
        };
        if let Some(v) = update.first_name {
            model.first_name = Set(Some(v));
        }
        if let Some(v) = update.last_name {
            model.last_name = Set(Some(v));
        }
        if let Some(v) = update.profile_description {
            model.profile_description = Set(Some(v));
        }
        if let Some(v) = update.gender {
            model.gender = Set(Some(v));
        }
        if let Some(v) = update.date_of_birth {
            model.date_of_birth = Set(Some(v));
        }
        self.store.update_user(model).await?;

        self.cache.invalidate(ResourceType::Profile, user_id).await;
        info!(user_id = %user_id, "Profile updated");

        self.load_snapshot(user_id).await
    }

    /// Change the username.
    ///
    /// Uniqueness is checked case-insensitively against every user, the
    /// caller included.
    pub async fn update_username(&self, user_id: &str, username: &str) -> AppResult<ProfileSnapshot> {
        let username = username.trim();
        validate_username(username)?;

        let current = self.store.get_live_user(user_id).await?;
        if self.store.username_exists(username).await? {
            return Err(AppError::duplicate("username", username));
        }

        self.store
            .update_user(user::ActiveModel {
                id: Set(user_id.to_string()),
                username: Set(username.to_string()),
                username_lower: Set(username.to_lowercase()),
                updated_at: Set(Some(Utc::now().into())),
                ..Default::default()
            })
            .await?;

        self.cache.invalidate(ResourceType::Profile, user_id).await;
        info!(user_id = %user_id, old = %current.username, new = %username, "Username changed");

        self.load_snapshot(user_id).await
    }

    /// Soft-delete an account.
    ///
    /// Email and username are anonymized, settings and interests are deleted,
    /// and the row stays behind as `banned`. There is no way back.
    pub async fn delete_account(&self, user_id: &str, confirmation: &str) -> AppResult<()> {
        if confirmation != DELETE_CONFIRMATION {
            return Err(AppError::validation(
                "confirmation",
                format!("must be exactly \"{DELETE_CONFIRMATION}\""),
            ));
        }

        let user = self.store.get_live_user(user_id).await?;
        let now = Utc::now();
        let username = anonymize(&user.username, now);

        self.store
            .soft_delete_user(user::ActiveModel {
                id: Set(user_id.to_string()),
                email: Set(anonymize(&user.email, now)),
                username_lower: Set(username.to_lowercase()),
                username: Set(username),
                status: Set(UserStatus::Banned),
                ban_expires_at: Set(None),
                deleted_at: Set(Some(now.into())),
                updated_at: Set(Some(now.into())),
                ..Default::default()
            })
            .await?;

        self.cache.invalidate_all(user_id).await;
        info!(user_id = %user_id, "Account deleted");

        Ok(())
    }

    async fn load_snapshot(&self, user_id: &str) -> AppResult<ProfileSnapshot> {
        let user = self.store.get_live_user(user_id).await?;
        let settings = self.store.find_settings(user_id).await?;
        let interests = self
            .store
            .find_interests(user_id)
            .await?
            .into_iter()
            .map(Interest::from)
            .collect();
        Ok(ProfileSnapshot::build(user, settings, interests))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::store::MemoryProfileStore;
    use chrono::{Duration, Months};
    use profile_common::{CacheConfig, MemoryCacheStore};
    use profile_db::test_utils::user_fixture;
    use std::sync::Arc;

    struct Harness {
        store: Arc<MemoryProfileStore>,
        cache_store: Arc<MemoryCacheStore>,
        service: ProfileService,
    }

    async fn setup() -> Harness {
        let store = Arc::new(MemoryProfileStore::new());
        store.insert_user(user_fixture("u1", "alice")).await;
        store.insert_user(user_fixture("u2", "bob")).await;
        let cache_store = Arc::new(MemoryCacheStore::new());
        let cache = ProfileCache::new(cache_store.clone(), &CacheConfig::default());
        Harness {
            service: ProfileService::new(store.clone(), cache),
            store,
            cache_store,
        }
    }

    #[tokio::test]
    async fn test_own_profile_is_full_and_cached() {
        let h = setup().await;
        let view = h.service.get_profile("u1", "u1").await.unwrap();

        assert!(matches!(view, ProfileView::Own(ref s) if s.email == "alice@example.com"));
        assert!(h.cache_store.contains("user_profile:u1").await);
    }

    #[tokio::test]
    async fn test_other_viewer_gets_public_projection() {
        let h = setup().await;
        let view = h.service.get_profile("u1", "u2").await.unwrap();
        assert!(matches!(view, ProfileView::Public(ref p) if p.username == "alice"));
    }

    #[tokio::test]
    async fn test_block_wins_over_cached_snapshot() {
        let h = setup().await;
        h.service.get_profile("u1", "u2").await.unwrap();
        h.store.block("u1", "u2").await;

        let result = h.service.get_profile("u1", "u2").await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_banned_user_hidden_from_others_only() {
        let h = setup().await;
        let mut user = h.store.user("u1").await.unwrap();
        user.status = UserStatus::Banned;
        h.store.insert_user(user).await;

        assert!(h.service.get_profile("u1", "u1").await.is_ok());
        let result = h.service.get_profile("u1", "u2").await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_expired_temporary_ban_is_visible() {
        let h = setup().await;
        let mut user = h.store.user("u1").await.unwrap();
        user.status = UserStatus::TemporaryBan;
        user.ban_expires_at = Some((Utc::now() - Duration::hours(1)).into());
        h.store.insert_user(user).await;

        assert!(h.service.get_profile("u1", "u2").await.is_ok());
    }

    #[tokio::test]
    async fn test_public_read_records_view() {
        let h = setup().await;
        h.service
            .get_public_profile("u1", &Principal::user("u2"))
            .await
            .unwrap();

        assert_eq!(h.store.profile_views().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unapproved_main_photo_hidden_from_public() {
        let h = setup().await;
        let mut user = h.store.user("u1").await.unwrap();
        user.main_photo_url = Some("https://cdn.example.com/a.jpg".to_string());
        h.store.insert_user(user).await;

        let view = h.service.get_profile("u1", "u2").await.unwrap();
        assert!(matches!(view, ProfileView::Public(ref p) if p.main_photo_url.is_none()));
    }

    #[tokio::test]
    async fn test_underage_date_of_birth_rejected() {
        let h = setup().await;
        let today = Utc::now().date_naive();
        let result = h
            .service
            .update_profile(
                "u1",
                ProfileUpdate {
                    date_of_birth: today.checked_sub_months(Months::new(12 * 17)),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation { ref field, .. }) if field == "date_of_birth"));
        assert!(h.store.user("u1").await.unwrap().date_of_birth.is_none());
    }

    #[tokio::test]
    async fn test_future_date_of_birth_rejected() {
        let h = setup().await;
        let result = h
            .service
            .update_profile(
                "u1",
                ProfileUpdate {
                    date_of_birth: Some(Utc::now().date_naive() + Duration::days(1)),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_update_profile_invalidates_cache() {
        let h = setup().await;
        h.service.get_profile("u1", "u1").await.unwrap();

        let snapshot = h
            .service
            .update_profile(
                "u1",
                ProfileUpdate {
                    first_name: Some("Alicia".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(snapshot.first_name.as_deref(), Some("Alicia"));
        assert!(!h.cache_store.contains("user_profile:u1").await);
    }

    #[tokio::test]
    async fn test_username_taken_ignoring_case() {
        let h = setup().await;
        let result = h.service.update_username("u2", "ALICE").await;

        assert!(matches!(result, Err(AppError::Duplicate { ref field, .. }) if field == "username"));
        assert_eq!(h.store.user("u2").await.unwrap().username, "bob");
    }

    #[tokio::test]
    async fn test_own_username_recased_is_duplicate() {
        let h = setup().await;
        let result = h.service.update_username("u1", "Alice").await;
        assert!(matches!(result, Err(AppError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn test_username_charset() {
        let h = setup().await;
        let result = h.service.update_username("u1", "al ice").await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let h = setup().await;
        let result = h.service.delete_account("u1", "delete my account").await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
        assert!(h.store.user("u1").await.unwrap().deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_delete_anonymizes_and_frees_username() {
        let h = setup().await;
        h.service.get_profile("u1", "u1").await.unwrap();

        h.service
            .delete_account("u1", DELETE_CONFIRMATION)
            .await
            .unwrap();

        let user = h.store.user("u1").await.unwrap();
        assert!(user.username.starts_with("deleted_"));
        assert!(user.email.starts_with("deleted_"));
        assert_eq!(user.status, UserStatus::Banned);
        assert!(!h.cache_store.contains("user_profile:u1").await);

        let result = h.service.get_profile("u1", "u1").await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));

        h.service.update_username("u2", "alice").await.unwrap();
    }
}
