//! Database repositories.

pub mod profile_view;
pub mod user;
pub mod user_block;
pub mod user_interest;
pub mod user_settings;

pub use profile_view::ProfileViewRepository;
pub use user::{CounterAdjustment, UserRepository};
pub use user_block::UserBlockRepository;
pub use user_interest::UserInterestRepository;
pub use user_settings::UserSettingsRepository;
