//! Main photo and extra-photo gallery.

use chrono::Utc;
use profile_common::{AppError, AppResult, LimitsConfig};
use profile_db::entities::user::{self, ModerationStatus};
use sea_orm::Set;
use serde::Serialize;
use tracing::info;

use super::cache::{ProfileCache, ResourceType};
use super::store::SharedProfileStore;

const MAX_PHOTO_URL_LEN: usize = 500;

/// Photos of a user after a change.
#[derive(Debug, Clone, Serialize)]
pub struct PhotoSet {
    pub main_photo_url: Option<String>,
    pub main_photo_moderation_status: ModerationStatus,
    pub extra_photos: Vec<String>,
}

impl From<user::Model> for PhotoSet {
    fn from(user: user::Model) -> Self {
        Self {
            extra_photos: user.extra_photos(),
            main_photo_url: user.main_photo_url,
            main_photo_moderation_status: user.main_photo_moderation_status,
        }
    }
}

fn validate_url(url: &str) -> AppResult<String> {
    let url = url.trim();
    if url.is_empty() || url.chars().count() > MAX_PHOTO_URL_LEN {
        return Err(AppError::validation(
            "photo_url",
            format!("must be 1-{MAX_PHOTO_URL_LEN} characters"),
        ));
    }
    Ok(url.to_string())
}

#[derive(Clone)]
pub struct PhotoService {
    store: SharedProfileStore,
    cache: ProfileCache,
    limits: LimitsConfig,
}

impl PhotoService {
    /// Create a new photo service.
    #[must_use]
    pub const fn new(store: SharedProfileStore, cache: ProfileCache, limits: LimitsConfig) -> Self {
        Self {
            store,
            cache,
            limits,
        }
    }

    /// Replace the main photo. A new photo always goes back to review.
    pub async fn set_main_photo(&self, user_id: &str, url: &str) -> AppResult<PhotoSet> {
        let url = validate_url(url)?;
        let current = self.store.get_live_user(user_id).await?;

        let updated = self
            .store
            .update_user(user::ActiveModel {
                id: Set(user_id.to_string()),
                main_photo_url: Set(Some(url)),
                main_photo_moderation_status: Set(ModerationStatus::Pending),
                updated_at: Set(Some(Utc::now().into())),
                ..Default::default()
            })
            .await?;

        self.cache.invalidate(ResourceType::Profile, user_id).await;

        info!(
            user_id = %user_id,
            previous_status = ?current.main_photo_moderation_status,
            "Main photo replaced, awaiting moderation"
        );

        Ok(updated.into())
    }

    /// Append an extra photo.
    pub async fn add_extra_photo(&self, user_id: &str, url: &str) -> AppResult<PhotoSet> {
        let url = validate_url(url)?;
        let current = self.store.get_live_user(user_id).await?;
        let mut photos = current.extra_photos();

        if photos.contains(&url) {
            return Err(AppError::duplicate("photo_url", url));
        }
        if photos.len() >= self.limits.max_extra_photos {
            return Err(AppError::limit_exceeded(
                "extra_photos",
                self.limits.max_extra_photos,
                photos.len(),
            ));
        }
        photos.push(url);

        let updated = self.write_extra_photos(user_id, photos).await?;
        Ok(updated.into())
    }

    /// Remove an extra photo by URL.
    pub async fn remove_extra_photo(&self, user_id: &str, url: &str) -> AppResult<PhotoSet> {
        let url = validate_url(url)?;
        let current = self.store.get_live_user(user_id).await?;
        let mut photos = current.extra_photos();

        let before = photos.len();
        photos.retain(|p| p != &url);
        if photos.len() == before {
            return Err(AppError::not_found("Photo"));
        }

        let updated = self.write_extra_photos(user_id, photos).await?;
        Ok(updated.into())
    }

    async fn write_extra_photos(&self, user_id: &str, photos: Vec<String>) -> AppResult<user::Model> {
        let count = photos.len();
        let updated = self
            .store
            .update_user(user::ActiveModel {
                id: Set(user_id.to_string()),
                profile_photos_extra: Set(serde_json::json!(photos)),
                updated_at: Set(Some(Utc::now().into())),
                ..Default::default()
            })
            .await?;

        self.cache.invalidate(ResourceType::Profile, user_id).await;
        info!(user_id = %user_id, count, "Extra photos updated");

        Ok(updated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::store::MemoryProfileStore;
    use profile_db::test_utils::user_fixture;
    use std::sync::Arc;

    async fn setup() -> (Arc<MemoryProfileStore>, PhotoService) {
        let store = Arc::new(MemoryProfileStore::new());
        store.insert_user(user_fixture("u1", "alice")).await;
        let service = PhotoService::new(
            store.clone(),
            ProfileCache::disabled(),
            LimitsConfig::default(),
        );
        (store, service)
    }

    fn url(n: usize) -> String {
        format!("https://cdn.example.com/{n}.jpg")
    }

    #[tokio::test]
    async fn test_new_main_photo_resets_approval() {
        let (store, service) = setup().await;
        let mut user = store.user("u1").await.unwrap();
        user.main_photo_url = Some(url(0));
        user.main_photo_moderation_status = ModerationStatus::Approved;
        store.insert_user(user).await;

        let photos = service.set_main_photo("u1", &url(1)).await.unwrap();

        assert_eq!(photos.main_photo_url, Some(url(1)));
        assert_eq!(photos.main_photo_moderation_status, ModerationStatus::Pending);
    }

    #[tokio::test]
    async fn test_ninth_extra_photo_rejected() {
        let (store, service) = setup().await;
        for n in 0..8 {
            service.add_extra_photo("u1", &url(n)).await.unwrap();
        }

        let result = service.add_extra_photo("u1", &url(8)).await;

        assert!(matches!(
            result,
            Err(AppError::LimitExceeded {
                limit: 8,
                current: 8,
                ..
            })
        ));
        assert_eq!(store.user("u1").await.unwrap().extra_photos().len(), 8);
    }

    #[tokio::test]
    async fn test_duplicate_extra_photo_rejected() {
        let (_, service) = setup().await;
        service.add_extra_photo("u1", &url(1)).await.unwrap();

        let result = service.add_extra_photo("u1", &url(1)).await;
        assert!(matches!(result, Err(AppError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn test_remove_missing_photo() {
        let (_, service) = setup().await;
        let result = service.remove_extra_photo("u1", &url(3)).await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_remove_extra_photo() {
        let (_, service) = setup().await;
        service.add_extra_photo("u1", &url(1)).await.unwrap();
        service.add_extra_photo("u1", &url(2)).await.unwrap();

        let photos = service.remove_extra_photo("u1", &url(1)).await.unwrap();
        assert_eq!(photos.extra_photos, vec![url(2)]);
    }

    #[tokio::test]
    async fn test_empty_url_rejected() {
        let (_, service) = setup().await;
        let result = service.set_main_photo("u1", "  ").await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }
}
