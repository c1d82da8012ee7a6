//! Kicker Stats - match lifecycle and team ELO ratings for table football
//!
//! This crate tracks matches played at shared tables from team selection to
//! the final score, and updates every participant's rating with a
//! margin-sensitive ELO variant once a match is finished.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod rating;
pub mod service;
pub mod store;
pub mod table;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{KickerError, Result};
pub use types::*;

// Re-export key components
pub use lifecycle::MatchLifecycleManager;
pub use rating::{MarginEloCalculator, RatingCalculator, RatingEngine};
pub use store::{InMemoryStore, Page};
pub use table::TableRegistry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
