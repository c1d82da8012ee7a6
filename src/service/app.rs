//! Main application state and service coordination
//!
//! This module contains the AppState that wires the stores, the table
//! registry, the match lifecycle manager and the rating engine together, and
//! the seeded simulation the binary runs on top of it.

use crate::config::{validate_config, AppConfig, SimulationSettings};
use crate::error::{KickerError, Result};
use crate::lifecycle::MatchLifecycleManager;
use crate::metrics::MetricsCollector;
use crate::rating::{MarginEloCalculator, RatingEngine};
use crate::store::{InMemoryStore, Page};
use crate::table::TableRegistry;
use crate::types::{Match, MatchId, PlayerId, PlayerPoints, RatingChange, TableId, TEAM_SIZE};
use crate::utils::{current_timestamp, generate_id};
use prometheus::TextEncoder;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// A closed match together with the rating changes it produced
#[derive(Debug, Clone)]
pub struct FinishedMatch {
    pub finished: Match,
    pub rating_changes: Vec<RatingChange>,
}

/// One row of the ratings table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub rating: i32,
    /// Rating updates received so far, one per rated match
    pub matches_rated: usize,
}

/// Summary of a simulation run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub table_id: TableId,
    pub matches_played: usize,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Backing store shared by every component
    store: Arc<InMemoryStore>,

    tables: Arc<TableRegistry>,
    matches: Arc<MatchLifecycleManager>,
    ratings: Arc<RatingEngine>,

    metrics_collector: Arc<MetricsCollector>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub fn new(config: AppConfig) -> std::result::Result<Self, ServiceError> {
        info!("Initializing {} kicker core", config.service.name);

        validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let calculator = MarginEloCalculator::new(config.rating.clone()).map_err(|e| {
            ServiceError::Configuration {
                message: e.to_string(),
            }
        })?;

        let store = Arc::new(InMemoryStore::new());
        let tables = Arc::new(TableRegistry::new(store.clone()));
        let matches = Arc::new(MatchLifecycleManager::with_metrics(
            store.clone(),
            store.clone(),
            store.clone(),
            config.match_rules.clone(),
            metrics_collector.clone(),
        ));
        let ratings = Arc::new(RatingEngine::with_metrics(
            store.clone(),
            store.clone(),
            Arc::new(calculator),
            metrics_collector.clone(),
        ));

        info!(
            "Rating constants: initial={}, k={}, scale={}, base={}, draws={:?}",
            config.rating.initial_rating,
            config.rating.k_factor,
            config.rating.scale,
            config.rating.margin_base,
            config.rating.draw_scoring
        );
        info!(
            "Match rules: sampling={:?}, leave={:?}",
            config.match_rules.team_sampling, config.match_rules.leave_policy
        );

        Ok(Self {
            config,
            store,
            tables,
            matches,
            ratings,
            metrics_collector,
        })
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<InMemoryStore> {
        self.store.clone()
    }

    pub fn tables(&self) -> Arc<TableRegistry> {
        self.tables.clone()
    }

    pub fn matches(&self) -> Arc<MatchLifecycleManager> {
        self.matches.clone()
    }

    pub fn ratings(&self) -> Arc<RatingEngine> {
        self.ratings.clone()
    }

    pub fn metrics_collector(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    /// Metrics in the Prometheus text format
    pub fn render_metrics(&self) -> Result<String> {
        let metric_families = self.metrics_collector.registry().gather();
        TextEncoder::new()
            .encode_to_string(&metric_families)
            .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))
    }

    /// Create a match at a table and make it the table's current match
    pub async fn open_match(&self, table_id: TableId) -> Result<Match> {
        let new_match = self
            .matches
            .create_match(table_id, current_timestamp())
            .await?;
        self.tables.open_match(table_id, new_match.id).await?;
        Ok(new_match)
    }

    /// Close a running match, release its table and rate its players.
    ///
    /// The ratings are checked against the would-be result first, so a
    /// match that cannot be rated stays Running and can be closed again.
    pub async fn finish_match(
        &self,
        match_id: MatchId,
        score_a: u32,
        score_b: u32,
        player_stats: &[PlayerPoints],
    ) -> Result<FinishedMatch> {
        let mut preview = self.matches.get_match(match_id).await?;
        // Invalid closes are rejected by the lifecycle manager below
        if preview
            .close(score_a, score_b, player_stats, current_timestamp())
            .is_ok()
        {
            self.ratings.check_match_ratings(&preview).await?;
        }

        let finished = self
            .matches
            .close_match(match_id, score_a, score_b, player_stats)
            .await?;
        self.tables
            .close_match(finished.table_id, finished.id)
            .await?;
        let rating_changes = self.ratings.update_match_ratings(&finished).await?;

        Ok(FinishedMatch {
            finished,
            rating_changes,
        })
    }

    /// Players ordered by current rating, best first
    pub async fn leaderboard(&self, players: &[PlayerId]) -> Result<Vec<LeaderboardEntry>> {
        let mut entries = Vec::with_capacity(players.len());
        for player_id in players {
            let rating = self.ratings.get_player_rating(*player_id).await?;
            let history = self
                .ratings
                .get_player_rating_history(*player_id, Page::all())
                .await?;
            entries.push(LeaderboardEntry {
                player_id: *player_id,
                rating: rating.score,
                matches_rated: history.len(),
            });
        }

        entries.sort_by(|a, b| b.rating.cmp(&a.rating));
        Ok(entries)
    }

    /// Play a reproducible series of matches between simulated players
    pub async fn run_simulation(&self, settings: &SimulationSettings) -> Result<SimulationReport> {
        info!(
            "Simulating {} matches between {} players (seed {})",
            settings.matches, settings.players, settings.seed
        );

        if settings.players < TEAM_SIZE * 2 {
            return Err(KickerError::invalid(format!(
                "A simulation needs at least {} players, got {}",
                TEAM_SIZE * 2,
                settings.players
            ))
            .into());
        }

        let mut rng = StdRng::seed_from_u64(settings.seed);

        let players: Vec<PlayerId> = (0..settings.players).map(|_| generate_id()).collect();
        for player_id in &players {
            self.ratings.initialize_player_rating(*player_id).await?;
        }

        let table = self.tables.create_table(&settings.table_name).await?;

        for round in 0..settings.matches {
            let lineup: Vec<PlayerId> = players
                .choose_multiple(&mut rng, TEAM_SIZE * 2)
                .copied()
                .collect();

            let opened = self.open_match(table.id).await?;
            for (i, player_id) in lineup.iter().enumerate() {
                let team_number = if i < TEAM_SIZE { 1 } else { 2 };
                self.matches
                    .join_match(opened.id, *player_id, team_number)
                    .await?;
            }

            let started = self
                .matches
                .start_match_randomized(opened.id, &mut rng)
                .await?;

            let (score_a, score_b) = play_out(&mut rng);
            let mut lines = split_goals(&mut rng, &started.team_a.players, score_a);
            lines.extend(split_goals(&mut rng, &started.team_b.players, score_b));
            let stats = merge_points(lines);

            let result = self
                .finish_match(started.id, score_a, score_b, &stats)
                .await?;
            debug!(
                "Round {}: {}:{} with {} rating changes",
                round + 1,
                score_a,
                score_b,
                result.rating_changes.len()
            );
        }

        let leaderboard = self.leaderboard(&players).await?;
        info!(
            "Simulation finished after {} matches",
            settings.matches
        );

        Ok(SimulationReport {
            table_id: table.id,
            matches_played: settings.matches,
            leaderboard,
        })
    }
}

/// Final score of a game to ten
fn play_out(rng: &mut StdRng) -> (u32, u32) {
    let loser_goals = rng.gen_range(0..10);
    if rng.gen_bool(0.5) {
        (10, loser_goals)
    } else {
        (loser_goals, 10)
    }
}

/// Distribute a team's goals over its players
fn split_goals(rng: &mut StdRng, team: &[PlayerId], goals: u32) -> Vec<PlayerPoints> {
    let mut remaining = goals;
    let mut stats = Vec::with_capacity(team.len());
    for (i, player_id) in team.iter().enumerate() {
        let points = if i + 1 == team.len() {
            remaining
        } else {
            rng.gen_range(0..=remaining)
        };
        remaining -= points;
        stats.push(PlayerPoints::new(*player_id, points));
    }
    stats
}

/// One line per player; a player drawn into several slots gets the sum
fn merge_points(lines: Vec<PlayerPoints>) -> Vec<PlayerPoints> {
    let mut merged: Vec<PlayerPoints> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|m| m.player_id == line.player_id) {
            Some(existing) => existing.points += line.points,
            None => merged.push(line),
        }
    }
    merged
}
