//! User settings service.

use chrono::Utc;
use profile_common::{AppError, AppResult};
use profile_db::entities::user_settings;
use sea_orm::{IntoActiveModel, Set};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::cache::{ProfileCache, ResourceType};
use super::store::SharedProfileStore;

/// Partial settings update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SettingsUpdate {
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
    pub activity_reminders: Option<bool>,
    pub community_updates: Option<bool>,
    pub friend_requests: Option<bool>,
    pub marketing_emails: Option<bool>,
    pub ghost_mode: Option<bool>,
    /// `en` or `en-US` form.
    pub language: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub timezone: Option<String>,
}

impl SettingsUpdate {
    fn check(&self) -> AppResult<()> {
        self.validate()?;
        if let Some(language) = &self.language {
            let len = language.chars().count();
            if len != 2 && len != 5 {
                return Err(AppError::validation("language", "must be 2 or 5 characters"));
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct SettingsService {
    store: SharedProfileStore,
    cache: ProfileCache,
}

impl SettingsService {
    /// Create a new settings service.
    #[must_use]
    pub const fn new(store: SharedProfileStore, cache: ProfileCache) -> Self {
        Self { store, cache }
    }

    /// Settings of a user, created with defaults on first access.
    pub async fn get_settings(&self, user_id: &str) -> AppResult<user_settings::Model> {
        if let Some(cached) = self.cache.get(ResourceType::Settings, user_id).await {
            return Ok(cached);
        }

        let settings = self.load_or_create(user_id).await?;
        self.cache
            .set(ResourceType::Settings, user_id, &settings)
            .await;
        Ok(settings)
    }

    /// Apply a partial update.
    pub async fn update_settings(
        &self,
        user_id: &str,
        update: SettingsUpdate,
    ) -> AppResult<user_settings::Model> {
        update.check()?;
        let current = self.load_or_create(user_id).await?;

        let mut active = current.into_active_model();
        if let Some(v) = update.email_notifications {
            active.email_notifications = Set(v);
        }
        if let Some(v) = update.push_notifications {
            active.push_notifications = Set(v);
        }
        if let Some(v) = update.activity_reminders {
            active.activity_reminders = Set(v);
        }
        if let Some(v) = update.community_updates {
            active.community_updates = Set(v);
        }
        if let Some(v) = update.friend_requests {
            active.friend_requests = Set(v);
        }
        if let Some(v) = update.marketing_emails {
            active.marketing_emails = Set(v);
        }
        if let Some(v) = update.ghost_mode {
            active.ghost_mode = Set(v);
        }
        if let Some(v) = update.language {
            active.language = Set(v);
        }
        if let Some(v) = update.timezone {
            active.timezone = Set(v);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.store.update_settings(active).await?;

        self.cache
            .invalidate_many(user_id, &[ResourceType::Settings, ResourceType::Profile])
            .await;
        info!(user_id = %user_id, "Settings updated");

        Ok(updated)
    }

    async fn load_or_create(&self, user_id: &str) -> AppResult<user_settings::Model> {
        self.store.get_live_user(user_id).await?;
        if let Some(settings) = self.store.find_settings(user_id).await? {
            return Ok(settings);
        }
        let defaults = user_settings::Model::defaults_for(user_id, Utc::now().into());
        self.store.create_settings(defaults).await
    }
}
