//! Database entities.

pub mod profile_view;
pub mod user;
pub mod user_block;
pub mod user_interest;
pub mod user_settings;

pub use profile_view::Entity as ProfileView;
pub use user::Entity as User;
pub use user_block::Entity as UserBlock;
pub use user_interest::Entity as UserInterest;
pub use user_settings::Entity as UserSettings;
