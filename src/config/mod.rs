//! Configuration management for the kicker-stats service
//!
//! This module handles all configuration loading from environment variables
//! and TOML files, validation, and default values.

pub mod app;
pub mod match_rules;
pub mod rating;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ServiceSettings, SimulationSettings};
pub use match_rules::{LeavePolicy, MatchRules, TeamSampling};
pub use rating::{DrawScoring, RatingConfig};
