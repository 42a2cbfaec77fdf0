//! Authenticated caller identity.

use profile_common::{AppError, AppResult};
use profile_db::entities::user::SubscriptionLevel;
use serde::{Deserialize, Serialize};

/// Capability level granted by the identity provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

/// A validated caller. The role is trusted as given and never looked up in
/// storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub subscription_level: SubscriptionLevel,
    pub role: Role,
    /// Browse without leaving profile-view records.
    pub ghost_mode: bool,
}

impl Principal {
    /// A regular user on the free tier.
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            subscription_level: SubscriptionLevel::Free,
            role: Role::User,
            ghost_mode: false,
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub const fn with_ghost_mode(mut self, ghost_mode: bool) -> Self {
        self.ghost_mode = ghost_mode;
        self
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Admins are moderators too.
    #[must_use]
    pub const fn is_moderator(&self) -> bool {
        matches!(self.role, Role::Moderator | Role::Admin)
    }

    pub fn require_moderator(&self) -> AppResult<()> {
        if self.is_moderator() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Moderator access required".to_string()))
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }

    /// Allow the user themselves or a moderator.
    pub fn require_self_or_moderator(&self, user_id: &str) -> AppResult<()> {
        if self.user_id == user_id || self.is_moderator() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Access denied".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_is_moderator() {
        let admin = Principal::user("a").with_role(Role::Admin);
        assert!(admin.is_moderator());
        assert!(admin.require_admin().is_ok());
    }

    #[test]
    fn test_user_is_not_moderator() {
        let user = Principal::user("u");
        assert!(matches!(
            user.require_moderator(),
            Err(AppError::Forbidden(_))
        ));
        assert!(user.require_self_or_moderator("u").is_ok());
        assert!(user.require_self_or_moderator("other").is_err());
    }
}
