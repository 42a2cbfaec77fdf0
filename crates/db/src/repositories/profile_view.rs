//! Profile view repository.

use std::sync::Arc;

use crate::entities::{ProfileView, profile_view};
use profile_common::{AppError, AppResult};
use sea_orm::{DatabaseConnection, EntityTrait, IntoActiveModel};

/// Profile view repository for database operations.
#[derive(Clone)]
pub struct ProfileViewRepository {
    db: Arc<DatabaseConnection>,
}

impl ProfileViewRepository {
    /// Create a new profile view repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record a view.
    pub async fn create(&self, model: profile_view::Model) -> AppResult<()> {
        ProfileView::insert(model.into_active_model())
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
