//! User settings entity (one row per user, created lazily).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    #[sea_orm(default_value = true)]
    pub email_notifications: bool,

    #[sea_orm(default_value = true)]
    pub push_notifications: bool,

    #[sea_orm(default_value = true)]
    pub activity_reminders: bool,

    #[sea_orm(default_value = true)]
    pub community_updates: bool,

    #[sea_orm(default_value = true)]
    pub friend_requests: bool,

    #[sea_orm(default_value = false)]
    pub marketing_emails: bool,

    /// Suppresses profile-view records while browsing
    #[sea_orm(default_value = false)]
    pub ghost_mode: bool,

    pub language: String,

    pub timezone: String,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Settings a user gets before changing anything.
    #[must_use]
    pub fn defaults_for(user_id: impl Into<String>, now: DateTimeWithTimeZone) -> Self {
        Self {
            user_id: user_id.into(),
            email_notifications: true,
            push_notifications: true,
            activity_reminders: true,
            community_updates: true,
            friend_requests: true,
            marketing_emails: false,
            ghost_mode: false,
            language: "en".to_string(),
            timezone: "UTC".to_string(),
            created_at: now,
            updated_at: None,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
