//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of an account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[sea_orm(string_value = "active")]
    #[default]
    Active,
    /// Banned until `ban_expires_at`.
    #[sea_orm(string_value = "temporary_ban")]
    TemporaryBan,
    /// Banned without expiry. Also the state of a deleted account.
    #[sea_orm(string_value = "banned")]
    Banned,
}

/// Moderation state of the main profile photo.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Subscription tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionLevel {
    #[sea_orm(string_value = "free")]
    #[default]
    Free,
    #[sea_orm(string_value = "club")]
    Club,
    #[sea_orm(string_value = "premium")]
    Premium,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub email: String,

    pub username: String,

    /// Lowercased username, unique across all users
    #[sea_orm(unique)]
    pub username_lower: String,

    #[sea_orm(nullable)]
    pub first_name: Option<String>,

    #[sea_orm(nullable)]
    pub last_name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub profile_description: Option<String>,

    #[sea_orm(nullable)]
    pub main_photo_url: Option<String>,

    pub main_photo_moderation_status: ModerationStatus,

    /// Extra photo URLs (JSON array of strings, at most 8)
    #[sea_orm(column_type = "JsonBinary")]
    pub profile_photos_extra: Json,

    #[sea_orm(nullable)]
    pub date_of_birth: Option<Date>,

    #[sea_orm(nullable)]
    pub gender: Option<String>,

    pub subscription_level: SubscriptionLevel,

    #[sea_orm(nullable)]
    pub subscription_expires_at: Option<DateTimeWithTimeZone>,

    pub status: UserStatus,

    /// Set only while `status` is `temporary_ban`
    #[sea_orm(nullable)]
    pub ban_expires_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(column_type = "Text", nullable)]
    pub ban_reason: Option<String>,

    #[sea_orm(default_value = false)]
    pub is_captain: bool,

    #[sea_orm(nullable)]
    pub captain_since: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub last_seen_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(default_value = 0)]
    pub verification_count: i32,

    #[sea_orm(default_value = 0)]
    pub no_show_count: i32,

    #[sea_orm(default_value = 0)]
    pub activities_attended_count: i32,

    #[sea_orm(default_value = 0)]
    pub activities_created_count: i32,

    #[sea_orm(default_value = false)]
    pub is_verified: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,

    /// Set when the account has been soft-deleted and anonymized
    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Extra photo URLs in insertion order.
    #[must_use]
    pub fn extra_photos(&self) -> Vec<String> {
        self.profile_photos_extra
            .as_array()
            .map(|urls| {
                urls.iter()
                    .filter_map(|v| v.as_str().map(ToString::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the account has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::user_settings::Entity")]
    Settings,

    #[sea_orm(has_many = "super::user_interest::Entity")]
    Interests,
}

impl Related<super::user_settings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Settings.def()
    }
}

impl Related<super::user_interest::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Interests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
