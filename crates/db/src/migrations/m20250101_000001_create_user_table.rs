//! Create user table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(User::Id).string_len(64).not_null().primary_key())
                    .col(ColumnDef::new(User::Email).string_len(320).not_null())
                    .col(ColumnDef::new(User::Username).string_len(128).not_null())
                    .col(ColumnDef::new(User::UsernameLower).string_len(128).not_null())
                    .col(ColumnDef::new(User::FirstName).string_len(100))
                    .col(ColumnDef::new(User::LastName).string_len(100))
                    .col(ColumnDef::new(User::ProfileDescription).text())
                    .col(ColumnDef::new(User::MainPhotoUrl).string_len(500))
                    .col(
                        ColumnDef::new(User::MainPhotoModerationStatus)
                            .string_len(32)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(User::ProfilePhotosExtra)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(ColumnDef::new(User::DateOfBirth).date())
                    .col(ColumnDef::new(User::Gender).string_len(50))
                    .col(
                        ColumnDef::new(User::SubscriptionLevel)
                            .string_len(32)
                            .not_null()
                            .default("free"),
                    )
                    .col(ColumnDef::new(User::SubscriptionExpiresAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(User::Status)
                            .string_len(32)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(User::BanExpiresAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(User::BanReason).text())
                    .col(ColumnDef::new(User::IsCaptain).boolean().not_null().default(false))
                    .col(ColumnDef::new(User::CaptainSince).timestamp_with_time_zone())
                    .col(ColumnDef::new(User::LastSeenAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(User::VerificationCount).integer().not_null().default(0))
                    .col(ColumnDef::new(User::NoShowCount).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(User::ActivitiesAttendedCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(User::ActivitiesCreatedCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(User::IsVerified).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(User::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(User::UpdatedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(User::DeletedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Unique index: username_lower (case-insensitive uniqueness)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_username_lower")
                    .table(User::Table)
                    .col(User::UsernameLower)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: moderation queue lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_user_main_photo_moderation_status")
                    .table(User::Table)
                    .col(User::MainPhotoModerationStatus)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_status")
                    .table(User::Table)
                    .col(User::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum User {
    Table,
    Id,
    Email,
    Username,
    UsernameLower,
    FirstName,
    LastName,
    ProfileDescription,
    MainPhotoUrl,
    MainPhotoModerationStatus,
    ProfilePhotosExtra,
    DateOfBirth,
    Gender,
    SubscriptionLevel,
    SubscriptionExpiresAt,
    Status,
    BanExpiresAt,
    BanReason,
    IsCaptain,
    CaptainSince,
    LastSeenAt,
    VerificationCount,
    NoShowCount,
    ActivitiesAttendedCount,
    ActivitiesCreatedCount,
    IsVerified,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
