//! Core profile logic: cache, visibility, account state, trust and the
//! profile orchestrator that composes them.

pub mod services;

pub use services::*;
