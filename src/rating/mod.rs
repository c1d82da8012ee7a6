//! Team-aware ELO rating
//!
//! This module provides the margin-sensitive rating calculator and the engine
//! that applies it to finished matches through the rating stores.

pub mod calculator;
pub mod engine;

// Re-export commonly used types
pub use calculator::{MarginEloCalculator, RatingCalculator, RatingOutcome};
pub use engine::RatingEngine;
