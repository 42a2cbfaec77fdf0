//! Row fixtures for tests.

use crate::entities::user;
use chrono::Utc;

/// An active user with empty counters and no photos.
#[must_use]
pub fn user_fixture(id: &str, username: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        email: format!("{}@example.com", username.to_lowercase()),
        username: username.to_string(),
        username_lower: username.to_lowercase(),
        first_name: Some("Test".to_string()),
        last_name: Some("User".to_string()),
        profile_description: None,
        main_photo_url: None,
        main_photo_moderation_status: user::ModerationStatus::Pending,
        profile_photos_extra: serde_json::json!([]),
        date_of_birth: None,
        gender: None,
        subscription_level: user::SubscriptionLevel::Free,
        subscription_expires_at: None,
        status: user::UserStatus::Active,
        ban_expires_at: None,
        ban_reason: None,
        is_captain: false,
        captain_since: None,
        last_seen_at: None,
        verification_count: 0,
        no_show_count: 0,
        activities_attended_count: 0,
        activities_created_count: 0,
        is_verified: false,
        created_at: Utc::now().into(),
        updated_at: None,
        deleted_at: None,
    }
}
