//! Common types used throughout the kicker core

use crate::error::{KickerError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for players (owned by the identity system)
pub type PlayerId = Uuid;

/// Unique identifier for matches
pub type MatchId = Uuid;

/// Unique identifier for match-scoped teams
pub type TeamId = Uuid;

/// Unique identifier for physical tables
pub type TableId = Uuid;

/// Unique identifier for rating snapshots
pub type RatingId = Uuid;

/// Unique identifier for rating history entries
pub type RatingHistoryId = Uuid;

/// Unique identifier for per-player match statistics
pub type StatId = Uuid;

/// Number of players on a full team
pub const TEAM_SIZE: usize = 2;

/// Lifecycle state of a match. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchState {
    /// Teams are being formed
    Open,
    /// Match is being played
    Running,
    /// Scores and stats are recorded (terminal state)
    Finished,
}

impl std::fmt::Display for MatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchState::Open => write!(f, "Open"),
            MatchState::Running => write!(f, "Running"),
            MatchState::Finished => write!(f, "Finished"),
        }
    }
}

/// One of the two sides of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamSide {
    A,
    B,
}

impl TeamSide {
    /// Resolve a caller-facing team number (1 or 2)
    pub fn from_number(team_number: u8) -> Result<Self> {
        match team_number {
            1 => Ok(TeamSide::A),
            2 => Ok(TeamSide::B),
            other => Err(KickerError::invalid(format!("Invalid team number: {}", other)).into()),
        }
    }

    pub fn number(self) -> u8 {
        match self {
            TeamSide::A => 1,
            TeamSide::B => 2,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            TeamSide::A => TeamSide::B,
            TeamSide::B => TeamSide::A,
        }
    }
}

/// A group of at most two players, scoped to a single match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub players: Vec<PlayerId>,
}

impl Team {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            players: Vec::with_capacity(TEAM_SIZE),
        }
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= TEAM_SIZE
    }

    pub fn contains(&self, player_id: &PlayerId) -> bool {
        self.players.contains(player_id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl Default for Team {
    fn default() -> Self {
        Self::new()
    }
}

/// Points a single player scored in a finished match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMatchStat {
    pub id: StatId,
    pub match_id: MatchId,
    pub player_id: PlayerId,
    pub points: u32,
}

impl PlayerMatchStat {
    pub fn new(match_id: MatchId, player_id: PlayerId, points: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            match_id,
            player_id,
            points,
        }
    }
}

/// Caller-supplied stat line when closing a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPoints {
    pub player_id: PlayerId,
    pub points: u32,
}

impl PlayerPoints {
    pub fn new(player_id: PlayerId, points: u32) -> Self {
        Self { player_id, points }
    }
}

/// One game between two teams at a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub table_id: TableId,
    pub team_a: Team,
    pub team_b: Team,
    pub state: MatchState,
    pub match_date: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub score_a: u32,
    pub score_b: u32,
    pub player_stats: Vec<PlayerMatchStat>,
    /// Optimistic concurrency token, bumped by the store on every update
    pub version: u64,
}

impl Match {
    pub fn team(&self, side: TeamSide) -> &Team {
        match side {
            TeamSide::A => &self.team_a,
            TeamSide::B => &self.team_b,
        }
    }

    pub fn team_mut(&mut self, side: TeamSide) -> &mut Team {
        match side {
            TeamSide::A => &mut self.team_a,
            TeamSide::B => &mut self.team_b,
        }
    }

    /// Side the player is on, if any
    pub fn side_of(&self, player_id: &PlayerId) -> Option<TeamSide> {
        if self.team_a.contains(player_id) {
            Some(TeamSide::A)
        } else if self.team_b.contains(player_id) {
            Some(TeamSide::B)
        } else {
            None
        }
    }

    pub fn score_of(&self, side: TeamSide) -> u32 {
        match side {
            TeamSide::A => self.score_a,
            TeamSide::B => self.score_b,
        }
    }

    pub fn stat_for(&self, player_id: &PlayerId) -> Option<&PlayerMatchStat> {
        self.player_stats
            .iter()
            .find(|stat| stat.player_id == *player_id)
    }

    /// All distinct players currently on either team
    pub fn participants(&self) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = Vec::with_capacity(TEAM_SIZE * 2);
        for player in self.team_a.players.iter().chain(self.team_b.players.iter()) {
            if !players.contains(player) {
                players.push(*player);
            }
        }
        players
    }
}

/// Append-only rating snapshot. The newest snapshot for a player is current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub id: RatingId,
    pub player_id: PlayerId,
    pub score: i32,
    pub created_at: DateTime<Utc>,
}

impl Rating {
    pub fn new(player_id: PlayerId, score: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id,
            score,
            created_at: Utc::now(),
        }
    }
}

/// Audit entry holding a player's score from before an update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingHistory {
    pub id: RatingHistoryId,
    pub player_id: PlayerId,
    pub score: i32,
    pub timestamp: DateTime<Utc>,
}

impl RatingHistory {
    pub fn new(player_id: PlayerId, score: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id,
            score,
            timestamp: Utc::now(),
        }
    }
}

/// A physical station where matches are played
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayTable {
    pub id: TableId,
    pub name: String,
    pub current_match: Option<MatchId>,
    pub closed_matches: Vec<MatchId>,
}

impl PlayTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            current_match: None,
            closed_matches: Vec::new(),
        }
    }
}

/// Outcome of a single rating update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingChange {
    pub player_id: PlayerId,
    pub match_id: MatchId,
    pub old_score: i32,
    pub new_score: i32,
    /// Expected score E
    pub expected: f64,
    /// Margin-sensitive actual score S
    pub actual: f64,
}

impl RatingChange {
    pub fn delta(&self) -> i32 {
        self.new_score - self.old_score
    }
}
