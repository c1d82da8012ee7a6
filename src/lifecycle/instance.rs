//! Match state machine
//!
//! Pure transitions on a [`Match`]. Nothing here touches a store; the
//! lifecycle manager applies these to a working copy and persists the result.
//!
//! ```text
//! Open --(start: both teams full)--> Running --(close: scores + stats)--> Finished
//! ```

use crate::config::match_rules::{LeavePolicy, TeamSampling};
use crate::error::{KickerError, Result};
use crate::types::{
    Match, MatchState, PlayTable, PlayerId, PlayerMatchStat, PlayerPoints, Team, TeamSide,
    TEAM_SIZE,
};
use crate::utils::generate_id;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Reject nil ids before any work is done
pub(crate) fn require_player(player_id: &PlayerId) -> Result<()> {
    if player_id.is_nil() {
        return Err(KickerError::MissingArgument { name: "player" }.into());
    }
    Ok(())
}

impl Match {
    /// A new open match with two empty teams
    pub fn open(table: &PlayTable, match_date: DateTime<Utc>) -> Self {
        Self {
            id: generate_id(),
            table_id: table.id,
            team_a: Team::new(),
            team_b: Team::new(),
            state: MatchState::Open,
            match_date,
            start_time: None,
            end_time: None,
            score_a: 0,
            score_b: 0,
            player_stats: Vec::new(),
            version: 0,
        }
    }

    fn require_state(&self, expected: MatchState, action: &str) -> Result<()> {
        if self.state != expected {
            return Err(KickerError::invalid(format!(
                "Cannot {} match {} in state {} (requires {})",
                action, self.id, self.state, expected
            ))
            .into());
        }
        Ok(())
    }

    /// Both teams have exactly two players and the match is still open
    pub fn is_ready_to_start(&self) -> bool {
        self.state == MatchState::Open
            && self.team_a.len() == TEAM_SIZE
            && self.team_b.len() == TEAM_SIZE
    }

    /// Add a player to one side. A player can only be on one team.
    pub fn join(&mut self, player_id: PlayerId, side: TeamSide) -> Result<()> {
        require_player(&player_id)?;
        self.require_state(MatchState::Open, "join")?;

        if let Some(current) = self.side_of(&player_id) {
            return Err(KickerError::invalid(format!(
                "Player {} already on team {} of match {}",
                player_id,
                current.number(),
                self.id
            ))
            .into());
        }

        let team = self.team_mut(side);
        if team.is_full() {
            return Err(KickerError::invalid("Team is full").into());
        }
        team.players.push(player_id);
        Ok(())
    }

    /// Remove a player from one side
    pub fn leave(&mut self, player_id: PlayerId, side: TeamSide, policy: LeavePolicy) -> Result<()> {
        require_player(&player_id)?;
        self.require_state(MatchState::Open, "leave")?;

        let team = self.team_mut(side);
        if policy == LeavePolicy::LegacyNotFull && team.is_full() {
            return Err(KickerError::invalid("Team is full").into());
        }

        let position = team
            .players
            .iter()
            .position(|p| *p == player_id)
            .ok_or_else(|| {
                KickerError::invalid(format!(
                    "Player {} is not on team {}",
                    player_id,
                    side.number()
                ))
            })?;
        team.players.remove(position);
        Ok(())
    }

    /// Move an open match with two full teams to Running
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.is_ready_to_start() {
            return Err(KickerError::invalid(format!(
                "Match {} is not open or not ready to start",
                self.id
            ))
            .into());
        }

        self.start_time = Some(now);
        self.state = MatchState::Running;
        Ok(())
    }

    /// Redraw both teams from the joined players, then start the match
    pub fn start_randomized<R: Rng>(
        &mut self,
        rng: &mut R,
        sampling: TeamSampling,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.require_state(MatchState::Open, "start")?;

        let drawn: Vec<PlayerId> = match sampling {
            TeamSampling::WithoutReplacement => {
                let mut pool = self.participants();
                if pool.len() != TEAM_SIZE * 2 {
                    return Err(KickerError::invalid(format!(
                        "Randomized start needs {} distinct players, match {} has {}",
                        TEAM_SIZE * 2,
                        self.id,
                        pool.len()
                    ))
                    .into());
                }
                pool.shuffle(rng);
                pool
            }
            TeamSampling::WithReplacement => {
                let pool: Vec<PlayerId> = self
                    .team_a
                    .players
                    .iter()
                    .chain(self.team_b.players.iter())
                    .copied()
                    .collect();
                if pool.is_empty() {
                    return Err(KickerError::invalid(format!(
                        "Randomized start of match {} needs at least one player",
                        self.id
                    ))
                    .into());
                }
                (0..TEAM_SIZE * 2)
                    .map(|_| pool[rng.gen_range(0..pool.len())])
                    .collect()
            }
        };

        let mut team_a = Team::new();
        team_a.players.extend_from_slice(&drawn[..TEAM_SIZE]);
        let mut team_b = Team::new();
        team_b.players.extend_from_slice(&drawn[TEAM_SIZE..]);

        self.team_a = team_a;
        self.team_b = team_b;
        self.start_time = Some(now);
        self.state = MatchState::Running;
        Ok(())
    }

    /// Record the final score and per-player stats of a running match.
    ///
    /// Stats are not checked against team membership; at most one line per
    /// player is accepted.
    pub fn close(
        &mut self,
        score_a: u32,
        score_b: u32,
        player_stats: &[PlayerPoints],
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.require_state(MatchState::Running, "close")?;

        let mut seen = HashSet::with_capacity(player_stats.len());
        for line in player_stats {
            require_player(&line.player_id)?;
            if !seen.insert(line.player_id) {
                return Err(KickerError::invalid(format!(
                    "Duplicate stats for player {} in match {}",
                    line.player_id, self.id
                ))
                .into());
            }
        }

        self.end_time = Some(now);
        self.score_a = score_a;
        self.score_b = score_b;
        self.player_stats = player_stats
            .iter()
            .map(|line| PlayerMatchStat::new(self.id, line.player_id, line.points))
            .collect();
        self.state = MatchState::Finished;
        Ok(())
    }
}
