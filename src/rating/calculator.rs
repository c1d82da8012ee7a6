//! Rating calculator trait and implementations
//!
//! The calculator is a pure function of the player's rating, the mean rating
//! of the opposing team and the final goal counts. Everything that touches a
//! store lives in [`crate::rating::engine`].

use crate::config::rating::{DrawScoring, RatingConfig};
use crate::error::{KickerError, Result};
use serde::{Deserialize, Serialize};

/// Outcome of rating a single player for a single match
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingOutcome {
    /// Expected score E in (0, 1)
    pub expected: f64,
    /// Margin-sensitive actual score S in [0, 1]
    pub actual: f64,
    pub new_rating: i32,
}

/// Trait for calculating a player's new rating after a match
pub trait RatingCalculator: Send + Sync {
    /// Probability-like expectation of `own` beating a side rated `opponent`
    fn expected_score(&self, own: f64, opponent: f64) -> f64;

    /// Actual score from the goal counts of the player's side and the other side
    fn actual_score(&self, own_goals: u32, enemy_goals: u32) -> f64;

    /// Apply the difference between actual and expected score
    fn new_rating(&self, current: i32, expected: f64, actual: f64) -> i32;

    /// Rating given to a player the first time they are rated
    fn initial_rating(&self) -> i32;

    /// Get current configuration as JSON
    fn config(&self) -> serde_json::Value;

    /// Run the full calculation for one player
    fn rate(
        &self,
        current: i32,
        opponent_mean: f64,
        own_goals: u32,
        enemy_goals: u32,
    ) -> RatingOutcome {
        let expected = self.expected_score(current as f64, opponent_mean);
        let actual = self.actual_score(own_goals, enemy_goals);
        RatingOutcome {
            expected,
            actual,
            new_rating: self.new_rating(current, expected, actual),
        }
    }
}

/// Team ELO variant with a margin-of-victory actual score.
///
/// `E = 1 / (1 + 10^((R_opp - R) / scale))`. A win scores
/// `base / (base + enemy)`, a loss `1 - base / (base + own)`, so a 10:0 win
/// is worth a full point and a narrow win much less.
#[derive(Debug, Clone, Default)]
pub struct MarginEloCalculator {
    config: RatingConfig,
}

impl MarginEloCalculator {
    /// Create a calculator from validated constants
    pub fn new(config: RatingConfig) -> Result<Self> {
        validate(&config)?;
        Ok(Self { config })
    }

    pub fn settings(&self) -> &RatingConfig {
        &self.config
    }
}

fn validate(config: &RatingConfig) -> Result<()> {
    let checks = [
        ("k_factor", config.k_factor),
        ("scale", config.scale),
        ("margin_base", config.margin_base),
    ];

    for (name, value) in checks {
        if !value.is_finite() || value <= 0.0 {
            return Err(KickerError::Configuration {
                message: format!("Rating {} must be a positive number, got {}", name, value),
            }
            .into());
        }
    }

    if config.initial_rating < 0 {
        return Err(KickerError::Configuration {
            message: "Initial rating must be non-negative".to_string(),
        }
        .into());
    }

    Ok(())
}

impl RatingCalculator for MarginEloCalculator {
    fn expected_score(&self, own: f64, opponent: f64) -> f64 {
        1.0 / (1.0 + 10f64.powf((opponent - own) / self.config.scale))
    }

    fn actual_score(&self, own_goals: u32, enemy_goals: u32) -> f64 {
        let base = self.config.margin_base;

        if own_goals == enemy_goals && self.config.draw_scoring == DrawScoring::Even {
            return 0.5;
        }

        if own_goals > enemy_goals {
            base / (base + enemy_goals as f64)
        } else {
            1.0 - base / (base + own_goals as f64)
        }
    }

    fn new_rating(&self, current: i32, expected: f64, actual: f64) -> i32 {
        (current as f64 + self.config.k_factor * (actual - expected)).round() as i32
    }

    fn initial_rating(&self) -> i32 {
        self.config.initial_rating
    }

    fn config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn calculator() -> MarginEloCalculator {
        MarginEloCalculator::default()
    }

    #[test]
    fn test_expected_score() {
        let calc = calculator();

        assert!((calc.expected_score(1200.0, 1200.0) - 0.5).abs() < 1e-12);
        assert!((calc.expected_score(1200.0, 1300.0) - 0.3869).abs() < 1e-4);
        assert!((calc.expected_score(1300.0, 1200.0) - 0.6131).abs() < 1e-4);
    }

    #[test]
    fn test_actual_score_margin() {
        let calc = calculator();

        assert_eq!(calc.actual_score(10, 0), 1.0);
        assert!((calc.actual_score(10, 5) - 2.0 / 3.0).abs() < 1e-12);
        assert!((calc.actual_score(10, 9) - 10.0 / 19.0).abs() < 1e-12);
        assert!((calc.actual_score(5, 10) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(calc.actual_score(0, 10), 0.0);
    }

    #[test]
    fn test_draw_scoring() {
        let even = calculator();
        assert_eq!(even.actual_score(5, 5), 0.5);

        let legacy = MarginEloCalculator::new(RatingConfig {
            draw_scoring: DrawScoring::Legacy,
            ..RatingConfig::default()
        })
        .unwrap();
        assert!((legacy.actual_score(5, 5) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(legacy.actual_score(0, 0), 0.0);
    }

    #[test]
    fn test_win_against_stronger_team() {
        let outcome = calculator().rate(1200, 1300.0, 10, 5);

        assert!((outcome.expected - 0.3869).abs() < 1e-4);
        assert!((outcome.actual - 0.6667).abs() < 1e-4);
        assert_eq!(outcome.new_rating, 1228);
    }

    #[test]
    fn test_even_match_shutout() {
        // E = 0.5, S = 1.0
        let outcome = calculator().rate(1200, 1200.0, 10, 0);
        assert_eq!(outcome.new_rating, 1250);

        let outcome = calculator().rate(1200, 1200.0, 0, 10);
        assert_eq!(outcome.new_rating, 1150);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RatingConfig {
            scale: 0.0,
            ..RatingConfig::default()
        };
        let err = MarginEloCalculator::new(config).unwrap_err();
        assert!(err.to_string().contains("scale"));

        let config = RatingConfig {
            initial_rating: -1,
            ..RatingConfig::default()
        };
        assert!(MarginEloCalculator::new(config).is_err());
    }

    #[test]
    fn test_config_json() {
        let config = calculator().config();
        assert_eq!(config["k_factor"], 100.0);
        assert_eq!(config["draw_scoring"], "even");
    }

    proptest! {
        #[test]
        fn prop_rating_is_deterministic(
            current in 0i32..3000,
            opponent in 0i32..3000,
            own in 0u32..20,
            enemy in 0u32..20,
        ) {
            let calc = calculator();
            let first = calc.rate(current, opponent as f64, own, enemy);
            let second = calc.rate(current, opponent as f64, own, enemy);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_change_is_bounded_by_k(
            current in 0i32..3000,
            opponent in 0i32..3000,
            own in 0u32..20,
            enemy in 0u32..20,
        ) {
            let outcome = calculator().rate(current, opponent as f64, own, enemy);
            prop_assert!((outcome.new_rating - current).abs() <= 100);
            prop_assert!(outcome.actual >= 0.0 && outcome.actual <= 1.0);
        }

        #[test]
        fn prop_decided_match_is_zero_sum(own in 1u32..20, enemy in 0u32..20) {
            prop_assume!(own > enemy);
            let calc = calculator();
            let total = calc.actual_score(own, enemy) + calc.actual_score(enemy, own);
            prop_assert!((total - 1.0).abs() < 1e-9);
        }
    }
}
