//! Moderation service for account bans and main-photo review.

use chrono::{DateTime, FixedOffset, Utc};
use profile_common::{AppError, AppResult};
use profile_db::entities::user::{self, ModerationStatus, UserStatus};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::cache::{ProfileCache, ResourceType};
use super::principal::Principal;
use super::store::SharedProfileStore;

const MAX_BAN_REASON_LEN: usize = 1000;
const MAX_PENDING_PAGE: u64 = 100;

/// Input for banning a user.
#[derive(Debug, Clone, Deserialize)]
pub struct BanInput {
    pub reason: String,
    /// Future expiry for a temporary ban; `None` bans permanently.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Moderator verdict on a main photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoDecision {
    Approved,
    Rejected,
}

impl From<PhotoDecision> for ModerationStatus {
    fn from(decision: PhotoDecision) -> Self {
        match decision {
            PhotoDecision::Approved => Self::Approved,
            PhotoDecision::Rejected => Self::Rejected,
        }
    }
}

/// Account state after a ban or unban.
#[derive(Debug, Clone, Serialize)]
pub struct BanOutcome {
    pub user_id: String,
    pub status: UserStatus,
    pub ban_reason: Option<String>,
    pub ban_expires_at: Option<DateTime<FixedOffset>>,
    pub moderator_id: String,
}

/// Photo state after a moderation decision.
#[derive(Debug, Clone, Serialize)]
pub struct PhotoModerationOutcome {
    pub user_id: String,
    pub main_photo_url: Option<String>,
    pub status: ModerationStatus,
    pub moderator_id: String,
}

/// A main photo waiting for review.
#[derive(Debug, Clone, Serialize)]
pub struct PendingPhoto {
    pub user_id: String,
    pub username: String,
    pub main_photo_url: String,
    pub updated_at: Option<DateTime<FixedOffset>>,
}

/// Status used for visibility decisions.
///
/// A temporary ban whose expiry has passed reads as active; the stored row
/// keeps `temporary_ban` until a moderator lifts it.
#[must_use]
pub fn effective_status(
    status: UserStatus,
    ban_expires_at: Option<DateTime<FixedOffset>>,
    now: DateTime<Utc>,
) -> UserStatus {
    match (status, ban_expires_at) {
        (UserStatus::TemporaryBan, Some(expires_at)) if expires_at <= now => UserStatus::Active,
        (status, _) => status,
    }
}

/// Moderation service for bans and photo review.
#[derive(Clone)]
pub struct ModerationService {
    store: SharedProfileStore,
    cache: ProfileCache,
}

impl ModerationService {
    /// Create a new moderation service.
    #[must_use]
    pub const fn new(store: SharedProfileStore, cache: ProfileCache) -> Self {
        Self { store, cache }
    }

    /// Ban a user, temporarily when `expires_at` is given.
    pub async fn ban(
        &self,
        moderator: &Principal,
        user_id: &str,
        input: BanInput,
    ) -> AppResult<BanOutcome> {
        moderator.require_moderator()?;

        let reason = input.reason.trim();
        if reason.is_empty() || reason.chars().count() > MAX_BAN_REASON_LEN {
            return Err(AppError::validation(
                "reason",
                format!("must be 1-{MAX_BAN_REASON_LEN} characters"),
            ));
        }
        if moderator.user_id == user_id {
            return Err(AppError::validation("user_id", "cannot ban yourself"));
        }

        let now = Utc::now();
        let (status, expires_at) = match input.expires_at {
            Some(expires_at) if expires_at <= now => {
                return Err(AppError::validation(
                    "expires_at",
                    "ban expiry must be in the future",
                ));
            }
            Some(expires_at) => (UserStatus::TemporaryBan, Some(expires_at.fixed_offset())),
            None => (UserStatus::Banned, None),
        };

        self.store.get_live_user(user_id).await?;

        let updated = self
            .store
            .update_user(user::ActiveModel {
                id: Set(user_id.to_string()),
                status: Set(status),
                ban_expires_at: Set(expires_at),
                ban_reason: Set(Some(reason.to_string())),
                updated_at: Set(Some(now.into())),
                ..Default::default()
            })
            .await?;

        self.cache.invalidate_all(user_id).await;

        info!(
            user_id = %user_id,
            moderator_id = %moderator.user_id,
            status = ?updated.status,
            expires_at = ?updated.ban_expires_at,
            "User banned"
        );

        Ok(BanOutcome {
            user_id: updated.id,
            status: updated.status,
            ban_reason: updated.ban_reason,
            ban_expires_at: updated.ban_expires_at,
            moderator_id: moderator.user_id.clone(),
        })
    }

    /// Lift any ban and return the user to active.
    pub async fn unban(&self, moderator: &Principal, user_id: &str) -> AppResult<BanOutcome> {
        moderator.require_moderator()?;
        self.store.get_live_user(user_id).await?;

        let updated = self
            .store
            .update_user(user::ActiveModel {
                id: Set(user_id.to_string()),
                status: Set(UserStatus::Active),
                ban_expires_at: Set(None),
                ban_reason: Set(None),
                updated_at: Set(Some(Utc::now().into())),
                ..Default::default()
            })
            .await?;

        self.cache.invalidate_all(user_id).await;

        info!(user_id = %user_id, moderator_id = %moderator.user_id, "User unbanned");

        Ok(BanOutcome {
            user_id: updated.id,
            status: updated.status,
            ban_reason: None,
            ban_expires_at: None,
            moderator_id: moderator.user_id.clone(),
        })
    }

    /// Approve or reject the current main photo.
    ///
    /// Re-applying a decision to an already moderated photo succeeds, since
    /// two moderators may act on the same photo concurrently.
    pub async fn moderate_photo(
        &self,
        moderator: &Principal,
        user_id: &str,
        decision: PhotoDecision,
    ) -> AppResult<PhotoModerationOutcome> {
        moderator.require_moderator()?;

        let current = self.store.get_live_user(user_id).await?;
        if current.main_photo_url.is_none() {
            return Err(AppError::not_found("Main photo"));
        }

        let status = ModerationStatus::from(decision);
        let updated = self
            .store
            .update_user(user::ActiveModel {
                id: Set(user_id.to_string()),
                main_photo_moderation_status: Set(status),
                updated_at: Set(Some(Utc::now().into())),
                ..Default::default()
            })
            .await?;

        self.cache.invalidate(ResourceType::Profile, user_id).await;

        info!(
            user_id = %user_id,
            moderator_id = %moderator.user_id,
            previous = ?current.main_photo_moderation_status,
            status = ?status,
            "Main photo moderated"
        );

        Ok(PhotoModerationOutcome {
            user_id: updated.id,
            main_photo_url: updated.main_photo_url,
            status: updated.main_photo_moderation_status,
            moderator_id: moderator.user_id.clone(),
        })
    }

    /// Main photos awaiting review, oldest first.
    pub async fn pending_photo_moderations(
        &self,
        moderator: &Principal,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<PendingPhoto>> {
        moderator.require_moderator()?;

        let users = self
            .store
            .find_pending_photo_moderations(limit.clamp(1, MAX_PENDING_PAGE), offset)
            .await?;

        Ok(users
            .into_iter()
            .filter_map(|u| {
                u.main_photo_url.map(|url| PendingPhoto {
                    user_id: u.id,
                    username: u.username,
                    main_photo_url: url,
                    updated_at: u.updated_at,
                })
            })
            .collect())
    }
}
