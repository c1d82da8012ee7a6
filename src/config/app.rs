//! Main application configuration
//!
//! This module defines the primary configuration structures for the kicker-stats
//! service, including environment variable and TOML file loading and validation.

use crate::config::match_rules::{LeavePolicy, MatchRules, TeamSampling};
use crate::config::rating::{DrawScoring, RatingConfig};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: RatingConfig,
    pub match_rules: MatchRules,
    pub simulation: SimulationSettings,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Settings for the seeded match simulation run by the binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Size of the simulated player pool (at least four)
    pub players: usize,
    /// Number of matches to play
    pub matches: usize,
    /// RNG seed, so a run can be reproduced
    pub seed: u64,
    /// Name of the table the matches are played on
    pub table_name: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "kicker-stats".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            players: 8,
            matches: 20,
            seed: 42,
            table_name: "Table 1".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml_str(&contents)?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse and validate a TOML document. Missing sections use defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(contents).map_err(|e| anyhow!("Invalid TOML configuration: {}", e))?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }

        // Rating settings
        if let Ok(initial) = env::var("INITIAL_RATING") {
            self.rating.initial_rating = initial
                .parse()
                .map_err(|_| anyhow!("Invalid INITIAL_RATING value: {}", initial))?;
        }
        if let Ok(k) = env::var("RATING_K_FACTOR") {
            self.rating.k_factor = k
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_K_FACTOR value: {}", k))?;
        }
        if let Ok(scale) = env::var("RATING_SCALE") {
            self.rating.scale = scale
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_SCALE value: {}", scale))?;
        }
        if let Ok(base) = env::var("RATING_MARGIN_BASE") {
            self.rating.margin_base = base
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_MARGIN_BASE value: {}", base))?;
        }
        if let Ok(draw) = env::var("DRAW_SCORING") {
            self.rating.draw_scoring = match draw.to_lowercase().as_str() {
                "even" => DrawScoring::Even,
                "legacy" => DrawScoring::Legacy,
                _ => return Err(anyhow!("Invalid DRAW_SCORING value: {}", draw)),
            };
        }

        // Match rules
        if let Ok(sampling) = env::var("TEAM_SAMPLING") {
            self.match_rules.team_sampling = match sampling.to_lowercase().as_str() {
                "without_replacement" => TeamSampling::WithoutReplacement,
                "with_replacement" => TeamSampling::WithReplacement,
                _ => return Err(anyhow!("Invalid TEAM_SAMPLING value: {}", sampling)),
            };
        }
        if let Ok(policy) = env::var("LEAVE_POLICY") {
            self.match_rules.leave_policy = match policy.to_lowercase().as_str() {
                "always" => LeavePolicy::Always,
                "legacy_not_full" => LeavePolicy::LegacyNotFull,
                _ => return Err(anyhow!("Invalid LEAVE_POLICY value: {}", policy)),
            };
        }

        // Simulation settings
        if let Ok(players) = env::var("SIMULATION_PLAYERS") {
            self.simulation.players = players
                .parse()
                .map_err(|_| anyhow!("Invalid SIMULATION_PLAYERS value: {}", players))?;
        }
        if let Ok(matches) = env::var("SIMULATION_MATCHES") {
            self.simulation.matches = matches
                .parse()
                .map_err(|_| anyhow!("Invalid SIMULATION_MATCHES value: {}", matches))?;
        }
        if let Ok(seed) = env::var("SIMULATION_SEED") {
            self.simulation.seed = seed
                .parse()
                .map_err(|_| anyhow!("Invalid SIMULATION_SEED value: {}", seed))?;
        }

        Ok(())
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate rating constants
    if config.rating.k_factor <= 0.0 {
        return Err(anyhow!("Rating K factor must be positive"));
    }
    if config.rating.scale <= 0.0 {
        return Err(anyhow!("Rating scale must be positive"));
    }
    if config.rating.margin_base <= 0.0 {
        return Err(anyhow!("Rating margin base must be positive"));
    }
    if config.rating.initial_rating < 0 {
        return Err(anyhow!("Initial rating cannot be negative"));
    }

    // Validate simulation settings
    if config.simulation.players < 4 {
        return Err(anyhow!("Simulation needs at least 4 players"));
    }
    if config.simulation.table_name.trim().is_empty() {
        return Err(anyhow!("Simulation table name cannot be empty"));
    }

    Ok(())
}
