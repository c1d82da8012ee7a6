//! Rating engine
//!
//! Applies the rating calculator to finished matches and persists the result
//! as an append-only pair of records: a history entry carrying the score
//! before the update, then a new current rating.

use crate::error::{KickerError, Result};
use crate::lifecycle::instance::require_player;
use crate::metrics::MetricsCollector;
use crate::rating::calculator::RatingCalculator;
use crate::store::{Page, RatingHistoryStore, RatingStore};
use crate::types::{Match, MatchState, PlayerId, Rating, RatingChange, RatingHistory};
use crate::utils::{mean_rating, KeyedLocks};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Ratings captured before any update of a batch is written
type Snapshot = HashMap<PlayerId, i32>;

/// Computes and persists rating changes for finished matches
pub struct RatingEngine {
    rating_store: Arc<dyn RatingStore>,
    history_store: Arc<dyn RatingHistoryStore>,
    calculator: Arc<dyn RatingCalculator>,
    /// Per-player critical sections around read-modify-write of the current rating
    locks: KeyedLocks<PlayerId>,
    metrics_collector: Arc<MetricsCollector>,
}

impl RatingEngine {
    pub fn new(
        rating_store: Arc<dyn RatingStore>,
        history_store: Arc<dyn RatingHistoryStore>,
        calculator: Arc<dyn RatingCalculator>,
    ) -> Self {
        let metrics_collector = Arc::new(MetricsCollector::new().unwrap_or_else(|_| {
            warn!("Failed to create metrics collector, using default");
            MetricsCollector::default()
        }));

        Self::with_metrics(rating_store, history_store, calculator, metrics_collector)
    }

    pub fn with_metrics(
        rating_store: Arc<dyn RatingStore>,
        history_store: Arc<dyn RatingHistoryStore>,
        calculator: Arc<dyn RatingCalculator>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            rating_store,
            history_store,
            calculator,
            locks: KeyedLocks::new(),
            metrics_collector,
        }
    }

    pub fn calculator(&self) -> &Arc<dyn RatingCalculator> {
        &self.calculator
    }

    /// Current rating of a player
    pub async fn get_player_rating(&self, player_id: PlayerId) -> Result<Rating> {
        require_player(&player_id)?;
        self.rating_store
            .get_current_rating(player_id)
            .await?
            .ok_or_else(|| KickerError::not_found("Rating", player_id).into())
    }

    /// Pre-update scores of a player, oldest first
    pub async fn get_player_rating_history(
        &self,
        player_id: PlayerId,
        page: Page,
    ) -> Result<Vec<RatingHistory>> {
        require_player(&player_id)?;
        self.history_store.list_history(player_id, page).await
    }

    /// Give a player the initial rating unless they already have one
    pub async fn initialize_player_rating(&self, player_id: PlayerId) -> Result<Rating> {
        require_player(&player_id)?;
        let _guard = self.locks.lock(&player_id).await;

        if let Some(existing) = self.rating_store.get_current_rating(player_id).await? {
            debug!("Player {} already rated {}", player_id, existing.score);
            return Ok(existing);
        }

        let rating = Rating::new(player_id, self.calculator.initial_rating());
        self.rating_store.insert_rating(rating.clone()).await?;
        self.rating_store.save().await?;

        info!("Initialized rating {} for player {}", rating.score, player_id);
        Ok(rating)
    }

    /// Rate one participant of a finished match.
    ///
    /// Not idempotent: calling it twice for the same player and match applies
    /// the change twice.
    pub async fn update_player_rating(
        &self,
        player_id: PlayerId,
        finished: &Match,
    ) -> Result<RatingChange> {
        require_player(&player_id)?;
        require_finished(finished)?;

        let timer = self.metrics_collector.start_timer();
        let _guard = self.locks.lock(&player_id).await;

        let result = self.rate_and_persist(player_id, finished, None).await;

        self.metrics_collector
            .record_operation("update_player_rating", timer.stop());
        self.observe(result)
    }

    /// Rate every player with a stat line in the match.
    ///
    /// All deltas are computed from the ratings held before the first write,
    /// so the result does not depend on the order players are processed in.
    /// Every stat line is checked against that snapshot first; a batch with
    /// an unrateable line writes nothing.
    pub async fn update_match_ratings(&self, finished: &Match) -> Result<Vec<RatingChange>> {
        require_finished(finished)?;

        let involved = involved_players(finished);
        let _guards = self.locks.lock_many(&involved).await;

        let timer = self.metrics_collector.start_timer();
        let result: Result<Vec<RatingChange>> = async {
            let snapshot = self.snapshot(&involved).await?;
            let players = plan_match_ratings(finished, &snapshot).map_err(|e| {
                self.metrics_collector.record_rating_failure(&e);
                warn!("Match {} cannot be rated: {}", finished.id, e);
                e
            })?;

            let mut changes = Vec::with_capacity(players.len());
            for player_id in players {
                let change = self.observe(
                    self.rate_and_persist(player_id, finished, Some(&snapshot))
                        .await,
                )?;
                changes.push(change);
            }
            Ok(changes)
        }
        .await;

        self.metrics_collector
            .record_operation("update_match_ratings", timer.stop());

        if let Ok(changes) = &result {
            info!(
                "Updated {} ratings for match {}",
                changes.len(),
                finished.id
            );
        }
        result
    }

    /// Check that `update_match_ratings` would accept a finished match,
    /// without writing anything
    pub async fn check_match_ratings(&self, finished: &Match) -> Result<()> {
        require_finished(finished)?;
        let snapshot = self.snapshot(&involved_players(finished)).await?;
        plan_match_ratings(finished, &snapshot).map(|_| ())
    }

    async fn snapshot(&self, players: &[PlayerId]) -> Result<Snapshot> {
        let mut snapshot = Snapshot::with_capacity(players.len());
        for player_id in players {
            if let Some(rating) = self.rating_store.get_current_rating(*player_id).await? {
                snapshot.insert(*player_id, rating.score);
            }
        }
        Ok(snapshot)
    }

    async fn rate_and_persist(
        &self,
        player_id: PlayerId,
        finished: &Match,
        snapshot: Option<&Snapshot>,
    ) -> Result<RatingChange> {
        let current = self.score_of(player_id, snapshot).await?;

        let stat = finished.stat_for(&player_id).ok_or_else(|| {
            error!(
                "Stats missing for player {} in finished match {}",
                player_id, finished.id
            );
            KickerError::InvariantViolation {
                reason: format!(
                    "Stats missing for player {} in match {}",
                    player_id, finished.id
                ),
            }
        })?;

        let side = finished
            .side_of(&player_id)
            .ok_or_else(|| not_on_team(player_id, finished))?;

        let own_goals = finished.score_of(side);
        let enemy_goals = finished.score_of(side.opponent());

        let opponents = &finished.team(side.opponent()).players;
        let mut opponent_scores = Vec::with_capacity(opponents.len());
        for opponent in opponents {
            opponent_scores.push(self.score_of(*opponent, snapshot).await?);
        }
        let opponent_mean =
            mean_rating(&opponent_scores).ok_or_else(|| empty_opponents(finished))?;

        let outcome = self
            .calculator
            .rate(current, opponent_mean, own_goals, enemy_goals);

        debug!(
            "Player {} ({} points) scored {}:{} against mean {:.1}: E={:.4} S={:.4}",
            player_id,
            stat.points,
            own_goals,
            enemy_goals,
            opponent_mean,
            outcome.expected,
            outcome.actual
        );

        // History first, so a failed rating insert never loses the old score
        self.history_store
            .insert_history(RatingHistory::new(player_id, current))
            .await?;
        self.history_store.save().await?;

        self.rating_store
            .insert_rating(Rating::new(player_id, outcome.new_rating))
            .await?;
        self.rating_store.save().await?;

        Ok(RatingChange {
            player_id,
            match_id: finished.id,
            old_score: current,
            new_score: outcome.new_rating,
            expected: outcome.expected,
            actual: outcome.actual,
        })
    }

    /// Score from the batch snapshot when there is one, else from the store
    async fn score_of(&self, player_id: PlayerId, snapshot: Option<&Snapshot>) -> Result<i32> {
        let score = match snapshot {
            Some(snapshot) => snapshot.get(&player_id).copied(),
            None => self
                .rating_store
                .get_current_rating(player_id)
                .await?
                .map(|rating| rating.score),
        };
        score.ok_or_else(|| KickerError::not_found("Rating", player_id).into())
    }

    fn observe(&self, result: Result<RatingChange>) -> Result<RatingChange> {
        match &result {
            Ok(change) => {
                self.metrics_collector.record_rating_update(change);
                info!(
                    "Player {} rating {} -> {} after match {}",
                    change.player_id, change.old_score, change.new_score, change.match_id
                );
            }
            Err(e) => {
                self.metrics_collector.record_rating_failure(e);
                warn!("Rating update failed: {}", e);
            }
        }
        result
    }
}

/// Participants plus anyone with a stat line, in lock order
fn involved_players(finished: &Match) -> Vec<PlayerId> {
    let mut involved = finished.participants();
    involved.extend(finished.player_stats.iter().map(|stat| stat.player_id));
    involved.sort();
    involved.dedup();
    involved
}

/// Distinct players to rate, once every stat line is known to be rateable
fn plan_match_ratings(finished: &Match, snapshot: &Snapshot) -> Result<Vec<PlayerId>> {
    let mut players: Vec<PlayerId> = Vec::with_capacity(finished.player_stats.len());
    for stat in &finished.player_stats {
        let player_id = stat.player_id;
        if players.contains(&player_id) {
            continue;
        }

        let side = finished
            .side_of(&player_id)
            .ok_or_else(|| not_on_team(player_id, finished))?;
        let opponents = &finished.team(side.opponent()).players;
        if opponents.is_empty() {
            return Err(empty_opponents(finished));
        }
        for rated in std::iter::once(&player_id).chain(opponents) {
            if !snapshot.contains_key(rated) {
                return Err(KickerError::not_found("Rating", rated).into());
            }
        }

        players.push(player_id);
    }
    Ok(players)
}

fn not_on_team(player_id: PlayerId, finished: &Match) -> anyhow::Error {
    error!(
        "Player {} has stats but is on neither team of match {}",
        player_id, finished.id
    );
    KickerError::InvariantViolation {
        reason: format!(
            "Player {} is not on a team in match {}",
            player_id, finished.id
        ),
    }
    .into()
}

fn empty_opponents(finished: &Match) -> anyhow::Error {
    KickerError::InvariantViolation {
        reason: format!("Opposing team of match {} is empty", finished.id),
    }
    .into()
}

fn require_finished(m: &Match) -> Result<()> {
    if m.state != MatchState::Finished {
        return Err(KickerError::invalid(format!(
            "Match {} is {}, ratings need a finished match",
            m.id, m.state
        ))
        .into());
    }
    Ok(())
}
