//! Persistence contracts consumed by the kicker core
//!
//! Each entity has its own store trait. Writes are synchronous relative to the
//! returning call: when a write returns `Ok`, the change is visible to every
//! later read. `save` commits anything a backend buffers; services call it
//! after their writes on every entry point.

pub mod memory;

use crate::error::Result;
use crate::types::{
    Match, MatchId, PlayTable, PlayerId, PlayerMatchStat, Rating, RatingHistory,
    RatingHistoryId, RatingId, StatId, TableId,
};
use async_trait::async_trait;

pub use memory::InMemoryStore;

/// Pagination for history queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Page {
    /// Every entry
    pub fn all() -> Self {
        Self::default()
    }

    /// The first `limit` entries
    pub fn first(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            offset: 0,
        }
    }

    /// `limit` entries after skipping `offset`
    pub fn window(limit: usize, offset: usize) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    /// Apply this page to an already filtered sequence
    pub fn apply<T>(&self, items: impl Iterator<Item = T>) -> Vec<T> {
        let skipped = items.skip(self.offset);
        match self.limit {
            Some(limit) => skipped.take(limit).collect(),
            None => skipped.collect(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn get_match(&self, id: MatchId) -> Result<Option<Match>>;

    /// Insert a new match; the stored copy starts at version 0
    async fn insert_match(&self, new_match: Match) -> Result<Match>;

    /// Replace a match if its stored version still equals `updated.version`.
    /// Returns the stored copy with the bumped version, or a `Conflict` error.
    async fn update_match(&self, updated: Match) -> Result<Match>;

    async fn save(&self) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn get_table(&self, id: TableId) -> Result<Option<PlayTable>>;

    async fn insert_table(&self, table: PlayTable) -> Result<()>;

    async fn update_table(&self, table: PlayTable) -> Result<()>;

    /// Every match created for the table, in creation order
    async fn list_matches_for_table(&self, id: TableId) -> Result<Vec<Match>>;

    async fn save(&self) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RatingStore: Send + Sync {
    async fn get_rating(&self, id: RatingId) -> Result<Option<Rating>>;

    /// Most recently inserted rating for the player
    async fn get_current_rating(&self, player_id: PlayerId) -> Result<Option<Rating>>;

    async fn insert_rating(&self, rating: Rating) -> Result<()>;

    async fn update_rating(&self, rating: Rating) -> Result<()>;

    async fn delete_rating(&self, id: RatingId) -> Result<()>;

    async fn save(&self) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RatingHistoryStore: Send + Sync {
    async fn get_history(&self, id: RatingHistoryId) -> Result<Option<RatingHistory>>;

    /// History for a player in insertion order, paginated
    async fn list_history(&self, player_id: PlayerId, page: Page) -> Result<Vec<RatingHistory>>;

    async fn insert_history(&self, entry: RatingHistory) -> Result<()>;

    async fn delete_history(&self, id: RatingHistoryId) -> Result<()>;

    async fn save(&self) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlayerMatchStatStore: Send + Sync {
    async fn list_stats_for_match(&self, match_id: MatchId) -> Result<Vec<PlayerMatchStat>>;

    async fn get_stat(&self, id: StatId) -> Result<Option<PlayerMatchStat>>;

    async fn insert_stat(&self, stat: PlayerMatchStat) -> Result<()>;

    async fn update_stat(&self, stat: PlayerMatchStat) -> Result<()>;

    async fn delete_stat(&self, id: StatId) -> Result<()>;

    async fn save(&self) -> Result<()>;
}
