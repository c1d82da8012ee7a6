//! Rating system configuration

use serde::{Deserialize, Serialize};

/// How the actual score S is computed when both teams scored the same
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawScoring {
    /// Both sides get S = 0.5
    Even,
    /// A draw takes the losing branch, S = 1 - base / (base + own score)
    Legacy,
}

/// Constants of the margin-sensitive team ELO variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingConfig {
    /// Rating assigned to a player the first time they are rated
    pub initial_rating: i32,
    /// Maximum rating change per match (K)
    pub k_factor: f64,
    /// Rating difference that makes a side ten times as likely to win
    pub scale: f64,
    /// Goal count that dampens the margin of victory
    pub margin_base: f64,
    pub draw_scoring: DrawScoring,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            initial_rating: 1200,
            k_factor: 100.0,
            scale: 500.0,
            margin_base: 10.0,
            draw_scoring: DrawScoring::Even,
        }
    }
}
