//! Create profile view table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProfileView::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProfileView::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProfileView::ViewerId).string_len(64).not_null())
                    .col(
                        ColumnDef::new(ProfileView::ViewedUserId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProfileView::ViewedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_profile_view_viewed_user")
                            .from(ProfileView::Table, ProfileView::ViewedUserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (viewed_user_id, viewed_at) for "who viewed me" listings
        manager
            .create_index(
                Index::create()
                    .name("idx_profile_view_viewed_user_at")
                    .table(ProfileView::Table)
                    .col(ProfileView::ViewedUserId)
                    .col(ProfileView::ViewedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProfileView::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ProfileView {
    Table,
    Id,
    ViewerId,
    ViewedUserId,
    ViewedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
