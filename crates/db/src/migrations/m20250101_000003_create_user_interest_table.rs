//! Create user interest table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserInterest::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserInterest::UserId).string_len(64).not_null())
                    .col(
                        ColumnDef::new(UserInterest::InterestTag)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserInterest::Weight)
                            .double()
                            .not_null()
                            .default(1.0),
                    )
                    .col(
                        ColumnDef::new(UserInterest::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(UserInterest::UserId)
                            .col(UserInterest::InterestTag),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_interest_user")
                            .from(UserInterest::Table, UserInterest::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: tag (for interest matching)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_interest_tag")
                    .table(UserInterest::Table)
                    .col(UserInterest::InterestTag)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserInterest::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum UserInterest {
    Table,
    UserId,
    InterestTag,
    Weight,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
