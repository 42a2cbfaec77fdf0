//! Create user block table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserBlock::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserBlock::BlockerId).string_len(64).not_null())
                    .col(ColumnDef::new(UserBlock::BlockedId).string_len(64).not_null())
                    .col(ColumnDef::new(UserBlock::Reason).text())
                    .col(
                        ColumnDef::new(UserBlock::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(UserBlock::BlockerId)
                            .col(UserBlock::BlockedId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_block_blocker")
                            .from(UserBlock::Table, UserBlock::BlockerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_block_blocked")
                            .from(UserBlock::Table, UserBlock::BlockedId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: blocked_id (for the reverse-direction check)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_block_blocked_id")
                    .table(UserBlock::Table)
                    .col(UserBlock::BlockedId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserBlock::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum UserBlock {
    Table,
    BlockerId,
    BlockedId,
    Reason,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
