//! User interest repository.

use std::sync::Arc;

use crate::entities::{UserInterest, user_interest};
use profile_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder,
    TransactionTrait, sea_query::OnConflict,
};

/// User interest repository for database operations.
#[derive(Clone)]
pub struct UserInterestRepository {
    db: Arc<DatabaseConnection>,
}

impl UserInterestRepository {
    /// Create a new interest repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Interests of a user, strongest first.
    pub async fn find_by_user_id(&self, user_id: &str) -> AppResult<Vec<user_interest::Model>> {
        UserInterest::find()
            .filter(user_interest::Column::UserId.eq(user_id))
            .order_by_desc(user_interest::Column::Weight)
            .order_by_asc(user_interest::Column::InterestTag)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replace every interest of a user in one transaction.
    pub async fn replace_all(
        &self,
        user_id: &str,
        interests: Vec<user_interest::Model>,
    ) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        UserInterest::delete_many()
            .filter(user_interest::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if !interests.is_empty() {
            UserInterest::insert_many(interests.into_iter().map(IntoActiveModel::into_active_model))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert an interest, or update its weight if the tag already exists.
    pub async fn upsert(&self, model: user_interest::Model) -> AppResult<()> {
        UserInterest::insert(model.into_active_model())
            .on_conflict(
                OnConflict::columns([
                    user_interest::Column::UserId,
                    user_interest::Column::InterestTag,
                ])
                .update_column(user_interest::Column::Weight)
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete one interest. Returns whether a row was removed.
    pub async fn delete(&self, user_id: &str, tag: &str) -> AppResult<bool> {
        let result = UserInterest::delete_many()
            .filter(user_interest::Column::UserId.eq(user_id))
            .filter(user_interest::Column::InterestTag.eq(tag))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }
}
