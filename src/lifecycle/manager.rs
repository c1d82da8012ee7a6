//! Match lifecycle manager
//!
//! This module provides the MatchLifecycleManager that owns every mutation
//! of a match: creation, team membership, start and close. Each mutation runs
//! under a per-match lock, is applied to a working copy, and only becomes
//! visible once the version-checked store write succeeds.

use crate::config::match_rules::MatchRules;
use crate::error::{KickerError, Result};
use crate::lifecycle::instance::require_player;
use crate::metrics::MetricsCollector;
use crate::store::{MatchStore, PlayerMatchStatStore, TableStore};
use crate::types::{Match, MatchId, MatchState, PlayerId, PlayerMatchStat, PlayerPoints, TableId, TeamSide};
use crate::utils::{current_timestamp, KeyedLocks};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Owner of the match state machine
pub struct MatchLifecycleManager {
    match_store: Arc<dyn MatchStore>,
    table_store: Arc<dyn TableStore>,
    stat_store: Arc<dyn PlayerMatchStatStore>,
    rules: MatchRules,
    /// Per-match critical sections
    locks: KeyedLocks<MatchId>,
    metrics_collector: Arc<MetricsCollector>,
}

impl MatchLifecycleManager {
    /// Create a new lifecycle manager
    pub fn new(
        match_store: Arc<dyn MatchStore>,
        table_store: Arc<dyn TableStore>,
        stat_store: Arc<dyn PlayerMatchStatStore>,
        rules: MatchRules,
    ) -> Self {
        let metrics_collector = Arc::new(MetricsCollector::new().unwrap_or_else(|_| {
            warn!("Failed to create metrics collector, using default");
            MetricsCollector::default()
        }));

        Self::with_metrics(match_store, table_store, stat_store, rules, metrics_collector)
    }

    /// Create a new lifecycle manager with metrics collector
    pub fn with_metrics(
        match_store: Arc<dyn MatchStore>,
        table_store: Arc<dyn TableStore>,
        stat_store: Arc<dyn PlayerMatchStatStore>,
        rules: MatchRules,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            match_store,
            table_store,
            stat_store,
            rules,
            locks: KeyedLocks::new(),
            metrics_collector,
        }
    }

    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    /// Create an open match with two empty teams at a table
    pub async fn create_match(&self, table_id: TableId, match_date: DateTime<Utc>) -> Result<Match> {
        if table_id.is_nil() {
            return Err(KickerError::MissingArgument { name: "table" }.into());
        }

        let table = self
            .table_store
            .get_table(table_id)
            .await?
            .ok_or_else(|| KickerError::not_found("Table", table_id))?;

        let new_match = Match::open(&table, match_date);
        let stored = self.match_store.insert_match(new_match).await?;
        self.match_store.save().await?;

        self.metrics_collector.record_match_created();
        info!(
            "Created match {} at table '{}' ({})",
            stored.id, table.name, table.id
        );
        Ok(stored)
    }

    /// Get a match by id
    pub async fn get_match(&self, match_id: MatchId) -> Result<Match> {
        require_match(&match_id)?;
        self.match_store
            .get_match(match_id)
            .await?
            .ok_or_else(|| KickerError::not_found("Match", match_id).into())
    }

    /// Stats recorded for a finished match
    pub async fn player_stats(&self, match_id: MatchId) -> Result<Vec<PlayerMatchStat>> {
        require_match(&match_id)?;
        self.stat_store.list_stats_for_match(match_id).await
    }

    /// Add a player to team 1 or 2
    pub async fn join_match(
        &self,
        match_id: MatchId,
        player_id: PlayerId,
        team_number: u8,
    ) -> Result<Match> {
        require_player(&player_id)?;
        let updated = self
            .mutate("join_match", match_id, |m| {
                let side = TeamSide::from_number(team_number)?;
                m.join(player_id, side)
            })
            .await?;

        self.metrics_collector.record_membership_change("join");
        info!(
            "Player {} joined team {} of match {}",
            player_id, team_number, match_id
        );
        Ok(updated)
    }

    /// Remove a player from team 1 or 2
    pub async fn leave_match(
        &self,
        match_id: MatchId,
        player_id: PlayerId,
        team_number: u8,
    ) -> Result<Match> {
        require_player(&player_id)?;
        let policy = self.rules.leave_policy;
        let updated = self
            .mutate("leave_match", match_id, |m| {
                let side = TeamSide::from_number(team_number)?;
                m.leave(player_id, side, policy)
            })
            .await?;

        self.metrics_collector.record_membership_change("leave");
        info!(
            "Player {} left team {} of match {}",
            player_id, team_number, match_id
        );
        Ok(updated)
    }

    /// Start a match whose two teams are full
    pub async fn start_match(&self, match_id: MatchId) -> Result<Match> {
        let now = current_timestamp();
        let updated = self
            .mutate("start_match", match_id, |m| m.start(now))
            .await?;

        self.metrics_collector.record_transition(MatchState::Running);
        info!(
            "Match {} started: {:?} vs {:?}",
            match_id, updated.team_a.players, updated.team_b.players
        );
        Ok(updated)
    }

    /// Redraw the teams from the joined players and start the match
    pub async fn start_match_randomized<R: Rng + Send>(
        &self,
        match_id: MatchId,
        rng: &mut R,
    ) -> Result<Match> {
        let now = current_timestamp();
        let sampling = self.rules.team_sampling;
        let updated = self
            .mutate("start_match_randomized", match_id, |m| {
                m.start_randomized(rng, sampling, now)
            })
            .await?;

        self.metrics_collector.record_transition(MatchState::Running);
        info!(
            "Match {} started with randomized teams ({:?}): {:?} vs {:?}",
            match_id, sampling, updated.team_a.players, updated.team_b.players
        );
        Ok(updated)
    }

    /// Record the final score and per-player stats of a running match.
    ///
    /// Stat lines are persisted before the match turns Finished and removed
    /// again when the match write fails, so a failed close leaves neither.
    pub async fn close_match(
        &self,
        match_id: MatchId,
        score_a: u32,
        score_b: u32,
        player_stats: &[PlayerPoints],
    ) -> Result<Match> {
        require_match(&match_id)?;
        let now = current_timestamp();
        let timer = self.metrics_collector.start_timer();
        let _guard = self.locks.lock(&match_id).await;

        let result: Result<Match> = async {
            let mut working = self.get_match(match_id).await?;
            working.close(score_a, score_b, player_stats, now)?;

            self.insert_stats(&working.player_stats).await?;

            let stored = match self.match_store.update_match(working.clone()).await {
                Ok(stored) => stored,
                Err(e) => {
                    self.remove_stats(&working.player_stats).await;
                    return Err(e);
                }
            };
            self.match_store.save().await?;
            Ok(stored)
        }
        .await;

        let updated = self.conclude("close_match", match_id, timer.stop(), result)?;

        self.metrics_collector.record_transition(MatchState::Finished);
        info!(
            "Match {} finished {}:{} with {} stat lines",
            match_id,
            score_a,
            score_b,
            updated.player_stats.len()
        );
        Ok(updated)
    }

    /// Insert and save stat lines, undoing the inserts on failure
    async fn insert_stats(&self, stats: &[PlayerMatchStat]) -> Result<()> {
        let mut inserted = 0;
        let result: Result<()> = async {
            for stat in stats {
                self.stat_store.insert_stat(stat.clone()).await?;
                inserted += 1;
            }
            self.stat_store.save().await
        }
        .await;

        if result.is_err() {
            self.remove_stats(&stats[..inserted]).await;
        }
        result
    }

    async fn remove_stats(&self, stats: &[PlayerMatchStat]) {
        if stats.is_empty() {
            return;
        }
        for stat in stats {
            if let Err(e) = self.stat_store.delete_stat(stat.id).await {
                error!("Failed to remove stat {} of match {}: {}", stat.id, stat.match_id, e);
            }
        }
        if let Err(e) = self.stat_store.save().await {
            error!("Failed to save stat removal: {}", e);
        }
    }

    /// Load, mutate and persist a match under its lock.
    ///
    /// The closure works on a copy; on any error nothing is written.
    async fn mutate<F>(&self, operation: &'static str, match_id: MatchId, apply: F) -> Result<Match>
    where
        F: FnOnce(&mut Match) -> Result<()> + Send,
    {
        require_match(&match_id)?;
        let timer = self.metrics_collector.start_timer();
        let _guard = self.locks.lock(&match_id).await;

        let result: Result<Match> = async {
            let mut working = self.get_match(match_id).await?;
            apply(&mut working)?;

            let stored = self.match_store.update_match(working).await?;
            self.match_store.save().await?;
            Ok(stored)
        }
        .await;

        self.conclude(operation, match_id, timer.stop(), result)
    }

    /// Record the outcome of a match operation
    fn conclude(
        &self,
        operation: &'static str,
        match_id: MatchId,
        elapsed: Duration,
        result: Result<Match>,
    ) -> Result<Match> {
        self.metrics_collector.record_operation(operation, elapsed);

        match result {
            Ok(stored) => {
                debug!(
                    "{} applied to match {} (version {})",
                    operation, match_id, stored.version
                );
                Ok(stored)
            }
            Err(e) => {
                warn!("{} rejected for match {}: {}", operation, match_id, e);
                self.metrics_collector.record_rejection(operation, &e);
                Err(e)
            }
        }
    }
}

fn require_match(match_id: &MatchId) -> Result<()> {
    if match_id.is_nil() {
        return Err(KickerError::MissingArgument { name: "match" }.into());
    }
    Ok(())
}
