//! User repository.

use std::sync::Arc;

use crate::entities::{
    User, UserInterest, UserSettings, user, user_block, user_interest, user_settings,
};
use chrono::{DateTime, FixedOffset};
use profile_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, SqlErr, TransactionTrait,
    sea_query::{Expr, Query},
};

/// Signed adjustments applied to the trust and activity counters in one statement.
///
/// Counters never drop below zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterAdjustment {
    /// Change to `verification_count`.
    pub verification: i32,
    /// Change to `no_show_count`.
    pub no_show: i32,
    /// Change to `activities_attended_count`.
    pub attended: i32,
    /// Change to `activities_created_count`.
    pub created: i32,
}

impl CounterAdjustment {
    /// Whether the adjustment changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.verification == 0 && self.no_show == 0 && self.attended == 0 && self.created == 0
    }
}

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether any user, deleted or not, holds this username (case-insensitive).
    pub async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let existing = User::find()
            .filter(user::Column::UsernameLower.eq(username.to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(existing.is_some())
    }

    /// Update a user that has not been soft-deleted.
    ///
    /// A deleted or missing row is `NotFound`, so a write racing a deletion
    /// cannot touch the anonymized row. A unique violation on the username
    /// index surfaces as a duplicate, which covers the race between the
    /// uniqueness check and the write.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        update_live(self.db.as_ref(), model).await
    }

    /// Apply counter adjustments atomically (single UPDATE query, no fetch).
    ///
    /// Returns the updated row, or `None` if the user does not exist or has
    /// been soft-deleted.
    pub async fn adjust_counters(
        &self,
        user_id: &str,
        adjustment: CounterAdjustment,
        now: DateTime<FixedOffset>,
    ) -> AppResult<Option<user::Model>> {
        let mut update = User::update_many()
            .col_expr(user::Column::UpdatedAt, Expr::value(now))
            .filter(user::Column::Id.eq(user_id))
            .filter(user::Column::DeletedAt.is_null());

        for (column, name, delta) in [
            (user::Column::VerificationCount, "verification_count", adjustment.verification),
            (user::Column::NoShowCount, "no_show_count", adjustment.no_show),
            (user::Column::ActivitiesAttendedCount, "activities_attended_count", adjustment.attended),
            (user::Column::ActivitiesCreatedCount, "activities_created_count", adjustment.created),
        ] {
            if delta > 0 {
                update = update.col_expr(column, Expr::col(column).add(delta));
            } else if delta < 0 {
                update = update.col_expr(
                    column,
                    Expr::cust(format!("GREATEST({name} - {}, 0)", delta.unsigned_abs())),
                );
            }
        }

        let result = update
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find_by_id(user_id).await
    }

    /// Record a presence heartbeat.
    pub async fn touch_last_seen(&self, user_id: &str, at: DateTime<FixedOffset>) -> AppResult<bool> {
        let result = User::update_many()
            .col_expr(user::Column::LastSeenAt, Expr::value(at))
            .filter(user::Column::Id.eq(user_id))
            .filter(user::Column::DeletedAt.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Users whose main photo awaits moderation, oldest first (paginated).
    pub async fn find_pending_photo_moderations(
        &self,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<user::Model>> {
        User::find()
            .filter(user::Column::MainPhotoUrl.is_not_null())
            .filter(user::Column::MainPhotoModerationStatus.eq(user::ModerationStatus::Pending))
            .filter(user::Column::DeletedAt.is_null())
            .order_by_asc(user::Column::UpdatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Search active users by username or name, hiding anyone blocked in either
    /// direction relative to the viewer.
    ///
    /// A temporary ban whose expiry has passed at `now` counts as active.
    pub async fn search(
        &self,
        query: &str,
        viewer_id: &str,
        limit: u64,
        offset: u64,
        now: DateTime<FixedOffset>,
    ) -> AppResult<Vec<user::Model>> {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));

        let blocked_by_viewer = Query::select()
            .column(user_block::Column::BlockedId)
            .from(user_block::Entity)
            .and_where(Expr::col(user_block::Column::BlockerId).eq(viewer_id))
            .to_owned();
        let blocking_viewer = Query::select()
            .column(user_block::Column::BlockerId)
            .from(user_block::Entity)
            .and_where(Expr::col(user_block::Column::BlockedId).eq(viewer_id))
            .to_owned();

        User::find()
            .filter(
                Condition::any()
                    .add(user::Column::Status.eq(user::UserStatus::Active))
                    .add(
                        Condition::all()
                            .add(user::Column::Status.eq(user::UserStatus::TemporaryBan))
                            .add(user::Column::BanExpiresAt.lte(now)),
                    ),
            )
            .filter(user::Column::DeletedAt.is_null())
            .filter(user::Column::Id.ne(viewer_id))
            .filter(user::Column::Id.not_in_subquery(blocked_by_viewer))
            .filter(user::Column::Id.not_in_subquery(blocking_viewer))
            .filter(
                Condition::any()
                    .add(user::Column::UsernameLower.like(pattern.as_str()))
                    .add(Expr::cust_with_values("LOWER(first_name) LIKE ?", [pattern.clone()]))
                    .add(Expr::cust_with_values("LOWER(last_name) LIKE ?", [pattern.clone()])),
            )
            .order_by_asc(user::Column::UsernameLower)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Soft-delete a user in one transaction: write the anonymized row, then
    /// drop the dependent interests and settings.
    pub async fn soft_delete(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Dropping `txn` on an early return rolls it back.
        let updated = update_live(&txn, model).await?;

        UserInterest::delete_many()
            .filter(user_interest::Column::UserId.eq(updated.id.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        UserSettings::delete_many()
            .filter(user_settings::Column::UserId.eq(updated.id.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(updated)
    }
}

async fn update_live<C: ConnectionTrait>(
    db: &C,
    model: user::ActiveModel,
) -> AppResult<user::Model> {
    let username = model.username.clone().take().unwrap_or_default();
    User::update(model)
        .filter(user::Column::DeletedAt.is_null())
        .exec(db)
        .await
        .map_err(|e| map_update_error(e, &username))
}

fn map_update_error(err: DbErr, username: &str) -> AppError {
    if matches!(err, DbErr::RecordNotUpdated) {
        return AppError::not_found("User");
    }
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::duplicate("username", username),
        _ => AppError::Database(err.to_string()),
    }
}

fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::user_fixture;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Set};

    #[tokio::test]
    async fn test_find_by_id_found() {
        let user = user_fixture("user1", "testuser");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let found = repo.find_by_id("user1").await.unwrap().unwrap();

        assert_eq!(found.id, "user1");
        assert_eq!(found.username, "testuser");
    }

    #[tokio::test]
    async fn test_update_of_deleted_row_is_not_found() {
        // The guarded UPDATE ... RETURNING matches no live row.
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let model = user::ActiveModel {
            id: Set("user1".to_string()),
            status: Set(user::UserStatus::Banned),
            ban_reason: Set(Some("spam".to_string())),
            ..Default::default()
        };
        let result = repo.update(model).await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[test]
    fn test_update_errors_keep_their_kind() {
        assert!(matches!(
            map_update_error(DbErr::RecordNotUpdated, "alice"),
            AppError::NotFound { .. }
        ));
        assert!(matches!(
            map_update_error(DbErr::Custom("boom".to_string()), "alice"),
            AppError::Database(_)
        ));
    }

    #[tokio::test]
    async fn test_username_exists() {
        let user = user_fixture("user1", "Alice");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        assert!(repo.username_exists("ALICE").await.unwrap());
        assert!(!repo.username_exists("bob").await.unwrap());
    }

    #[tokio::test]
    async fn test_adjust_counters_returns_updated_row() {
        let mut user = user_fixture("user1", "testuser");
        user.verification_count = 3;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[user]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let adjustment = CounterAdjustment {
            verification: 1,
            ..CounterAdjustment::default()
        };
        let updated = repo
            .adjust_counters("user1", adjustment, Utc::now().into())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.verification_count, 3);
    }

    #[tokio::test]
    async fn test_adjust_counters_missing_user() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let adjustment = CounterAdjustment {
            no_show: 1,
            ..CounterAdjustment::default()
        };
        let result = repo
            .adjust_counters("missing", adjustment, Utc::now().into())
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_soft_delete_commits_all_steps() {
        let mut deleted = user_fixture("user1", "deleted_1_alice");
        deleted.status = user::UserStatus::Banned;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[deleted.clone()]])
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 2,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let model = user::ActiveModel {
            id: Set("user1".to_string()),
            status: Set(user::UserStatus::Banned),
            ..Default::default()
        };
        let result = repo.soft_delete(model).await.unwrap();

        assert_eq!(result.status, user::UserStatus::Banned);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("a_b%c"), "a\\_b\\%c");
    }

    #[test]
    fn test_counter_adjustment_is_empty() {
        assert!(CounterAdjustment::default().is_empty());
        assert!(
            !CounterAdjustment {
                created: -1,
                ..CounterAdjustment::default()
            }
            .is_empty()
        );
    }
}
