//! Business logic services.

#![allow(missing_docs)]

pub mod cache;
pub mod health;
pub mod interest;
pub mod moderation;
pub mod photo;
pub mod principal;
pub mod profile;
pub mod search;
pub mod settings;
pub mod store;
pub mod subscription;
pub mod trust;
pub mod verification;
pub mod visibility;

pub use cache::{CacheStatus, ProfileCache, ResourceType};
pub use health::{DatabaseStatus, HealthReport, HealthService};
pub use interest::{Interest, InterestInput, InterestService};
pub use moderation::{
    BanInput, BanOutcome, ModerationService, PendingPhoto, PhotoDecision, PhotoModerationOutcome,
    effective_status,
};
pub use photo::{PhotoService, PhotoSet};
pub use principal::{Principal, Role};
pub use profile::{
    DELETE_CONFIRMATION, ProfileService, ProfileSnapshot, ProfileUpdate, ProfileView,
    PublicProfile,
};
pub use search::{SearchService, UserSummary};
pub use settings::{SettingsService, SettingsUpdate};
#[cfg(any(test, feature = "test-utils"))]
pub use store::MemoryProfileStore;
pub use store::{DatabaseProfileStore, ProfileStore, SharedProfileStore};
pub use subscription::{SubscriptionInfo, SubscriptionService, SubscriptionUpdate};
pub use trust::{NO_SHOW_BAN_THRESHOLD, no_show_warning, trust_score};
pub use verification::{ActivityCounterDelta, VerificationMetrics, VerificationService};
pub use visibility::VisibilityFilter;
