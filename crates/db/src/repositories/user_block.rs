//! Block relation repository (read side).

use std::sync::Arc;

use crate::entities::{UserBlock, user_block};
use profile_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter};

/// Block relation repository for database operations.
#[derive(Clone)]
pub struct UserBlockRepository {
    db: Arc<DatabaseConnection>,
}

impl UserBlockRepository {
    /// Create a new block repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Check if either user is blocking the other, in a single query.
    pub async fn is_blocked_between(&self, user_a: &str, user_b: &str) -> AppResult<bool> {
        let row = UserBlock::find()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(user_block::Column::BlockerId.eq(user_a))
                            .add(user_block::Column::BlockedId.eq(user_b)),
                    )
                    .add(
                        Condition::all()
                            .add(user_block::Column::BlockerId.eq(user_b))
                            .add(user_block::Column::BlockedId.eq(user_a)),
                    ),
            )
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.is_some())
    }
}
