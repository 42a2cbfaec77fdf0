//! Block-aware visibility between users.

use chrono::Utc;
use profile_common::{AppResult, IdGenerator};
use profile_db::entities::profile_view;
use tracing::{debug, warn};

use super::principal::Principal;
use super::store::SharedProfileStore;

/// Decides whether one user may see another and records profile views.
///
/// Visibility is never cached: a block must take effect on the very next read.
#[derive(Clone)]
pub struct VisibilityFilter {
    store: SharedProfileStore,
    id_gen: IdGenerator,
}

impl VisibilityFilter {
    /// Create a new visibility filter.
    #[must_use]
    pub const fn new(store: SharedProfileStore) -> Self {
        Self {
            store,
            id_gen: IdGenerator::new(),
        }
    }

    /// Whether `viewer_id` may see `subject_id`.
    ///
    /// Self-view is always allowed. Otherwise a block in either direction
    /// hides both users from each other.
    pub async fn is_visible(&self, subject_id: &str, viewer_id: &str) -> AppResult<bool> {
        if subject_id == viewer_id {
            return Ok(true);
        }
        let blocked = self.store.is_blocked_between(subject_id, viewer_id).await?;
        if blocked {
            debug!(subject_id = %subject_id, viewer_id = %viewer_id, "Profile concealed by block");
        }
        Ok(!blocked)
    }

    /// Record that `viewer` looked at `subject_id`.
    ///
    /// Skipped for self-views and while the viewer browses in ghost mode,
    /// whether the flag comes from the token or the stored settings. Failures
    /// are logged and never returned.
    pub async fn record_view(&self, viewer: &Principal, subject_id: &str) {
        if viewer.user_id == subject_id || viewer.ghost_mode {
            return;
        }

        match self.store.find_settings(&viewer.user_id).await {
            Ok(Some(settings)) if settings.ghost_mode => return,
            Ok(_) => {}
            Err(e) => {
                warn!(viewer_id = %viewer.user_id, error = %e, "Could not read viewer settings, skipping profile view");
                return;
            }
        }

        let view = profile_view::Model {
            id: self.id_gen.generate(),
            viewer_id: viewer.user_id.clone(),
            viewed_user_id: subject_id.to_string(),
            viewed_at: Utc::now().into(),
        };
        if let Err(e) = self.store.record_profile_view(view).await {
            warn!(viewer_id = %viewer.user_id, subject_id = %subject_id, error = %e, "Failed to record profile view");
        }
    }
}
