//! User settings repository.

use std::sync::Arc;

use crate::entities::{UserSettings, user_settings};
use profile_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel};

/// User settings repository for database operations.
#[derive(Clone)]
pub struct UserSettingsRepository {
    db: Arc<DatabaseConnection>,
}

impl UserSettingsRepository {
    /// Create a new settings repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find settings by user ID.
    pub async fn find_by_user_id(&self, user_id: &str) -> AppResult<Option<user_settings::Model>> {
        UserSettings::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a settings row.
    pub async fn create(&self, model: user_settings::Model) -> AppResult<user_settings::Model> {
        model
            .into_active_model()
            .reset_all()
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a settings row.
    pub async fn update(
        &self,
        model: user_settings::ActiveModel,
    ) -> AppResult<user_settings::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
