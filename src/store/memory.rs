//! In-memory implementation of every store contract
//!
//! Backs the simulation binary and the test suites. All entity tables live
//! behind a single lock, so each call observes and produces a consistent
//! snapshot.

use crate::error::{KickerError, Result};
use crate::store::{
    MatchStore, Page, PlayerMatchStatStore, RatingHistoryStore, RatingStore, TableStore,
};
use crate::types::{
    Match, MatchId, PlayTable, PlayerId, PlayerMatchStat, Rating, RatingHistory,
    RatingHistoryId, RatingId, StatId, TableId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    matches: HashMap<MatchId, Match>,
    /// Creation order, for per-table listings
    match_order: Vec<MatchId>,
    tables: HashMap<TableId, PlayTable>,
    /// Append-only; the last entry for a player is current
    ratings: Vec<Rating>,
    history: Vec<RatingHistory>,
    stats: Vec<PlayerMatchStat>,
}

/// Thread-safe in-memory store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    save_calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls received across all contracts
    pub fn save_count(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// Every rating snapshot for a player, oldest first
    pub fn ratings_for_player(&self, player_id: PlayerId) -> Result<Vec<Rating>> {
        let tables = self.read()?;
        Ok(tables
            .ratings
            .iter()
            .filter(|rating| rating.player_id == player_id)
            .cloned()
            .collect())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| {
            KickerError::Internal {
                message: "Failed to acquire store read lock".to_string(),
            }
            .into()
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| {
            KickerError::Internal {
                message: "Failed to acquire store write lock".to_string(),
            }
            .into()
        })
    }

    fn record_save(&self) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl MatchStore for InMemoryStore {
    async fn get_match(&self, id: MatchId) -> Result<Option<Match>> {
        Ok(self.read()?.matches.get(&id).cloned())
    }

    async fn insert_match(&self, mut new_match: Match) -> Result<Match> {
        let mut tables = self.write()?;
        if tables.matches.contains_key(&new_match.id) {
            return Err(KickerError::Storage {
                message: format!("Match {} already exists", new_match.id),
            }
            .into());
        }
        new_match.version = 0;
        tables.match_order.push(new_match.id);
        tables.matches.insert(new_match.id, new_match.clone());
        Ok(new_match)
    }

    async fn update_match(&self, mut updated: Match) -> Result<Match> {
        let mut tables = self.write()?;
        let stored = tables
            .matches
            .get_mut(&updated.id)
            .ok_or_else(|| KickerError::not_found("Match", updated.id))?;

        if stored.version != updated.version {
            return Err(KickerError::Conflict {
                entity: "Match",
                id: updated.id.to_string(),
            }
            .into());
        }

        updated.version += 1;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn save(&self) -> Result<()> {
        self.record_save()
    }
}

#[async_trait]
impl TableStore for InMemoryStore {
    async fn get_table(&self, id: TableId) -> Result<Option<PlayTable>> {
        Ok(self.read()?.tables.get(&id).cloned())
    }

    async fn insert_table(&self, table: PlayTable) -> Result<()> {
        let mut tables = self.write()?;
        if tables.tables.contains_key(&table.id) {
            return Err(KickerError::Storage {
                message: format!("Table {} already exists", table.id),
            }
            .into());
        }
        tables.tables.insert(table.id, table);
        Ok(())
    }

    async fn update_table(&self, table: PlayTable) -> Result<()> {
        let mut tables = self.write()?;
        let stored = tables
            .tables
            .get_mut(&table.id)
            .ok_or_else(|| KickerError::not_found("Table", table.id))?;
        *stored = table;
        Ok(())
    }

    async fn list_matches_for_table(&self, id: TableId) -> Result<Vec<Match>> {
        let tables = self.read()?;
        Ok(tables
            .match_order
            .iter()
            .filter_map(|match_id| tables.matches.get(match_id))
            .filter(|m| m.table_id == id)
            .cloned()
            .collect())
    }

    async fn save(&self) -> Result<()> {
        self.record_save()
    }
}

#[async_trait]
impl RatingStore for InMemoryStore {
    async fn get_rating(&self, id: RatingId) -> Result<Option<Rating>> {
        let tables = self.read()?;
        Ok(tables.ratings.iter().find(|r| r.id == id).cloned())
    }

    async fn get_current_rating(&self, player_id: PlayerId) -> Result<Option<Rating>> {
        let tables = self.read()?;
        Ok(tables
            .ratings
            .iter()
            .rev()
            .find(|r| r.player_id == player_id)
            .cloned())
    }

    async fn insert_rating(&self, rating: Rating) -> Result<()> {
        self.write()?.ratings.push(rating);
        Ok(())
    }

    async fn update_rating(&self, rating: Rating) -> Result<()> {
        let mut tables = self.write()?;
        let stored = tables
            .ratings
            .iter_mut()
            .find(|r| r.id == rating.id)
            .ok_or_else(|| KickerError::not_found("Rating", rating.id))?;
        *stored = rating;
        Ok(())
    }

    async fn delete_rating(&self, id: RatingId) -> Result<()> {
        let mut tables = self.write()?;
        let before = tables.ratings.len();
        tables.ratings.retain(|r| r.id != id);
        if tables.ratings.len() == before {
            return Err(KickerError::not_found("Rating", id).into());
        }
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        self.record_save()
    }
}

#[async_trait]
impl RatingHistoryStore for InMemoryStore {
    async fn get_history(&self, id: RatingHistoryId) -> Result<Option<RatingHistory>> {
        let tables = self.read()?;
        Ok(tables.history.iter().find(|h| h.id == id).cloned())
    }

    async fn list_history(&self, player_id: PlayerId, page: Page) -> Result<Vec<RatingHistory>> {
        let tables = self.read()?;
        Ok(page.apply(
            tables
                .history
                .iter()
                .filter(|h| h.player_id == player_id)
                .cloned(),
        ))
    }

    async fn insert_history(&self, entry: RatingHistory) -> Result<()> {
        self.write()?.history.push(entry);
        Ok(())
    }

    async fn delete_history(&self, id: RatingHistoryId) -> Result<()> {
        let mut tables = self.write()?;
        let before = tables.history.len();
        tables.history.retain(|h| h.id != id);
        if tables.history.len() == before {
            return Err(KickerError::not_found("RatingHistory", id).into());
        }
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        self.record_save()
    }
}

#[async_trait]
impl PlayerMatchStatStore for InMemoryStore {
    async fn list_stats_for_match(&self, match_id: MatchId) -> Result<Vec<PlayerMatchStat>> {
        let tables = self.read()?;
        Ok(tables
            .stats
            .iter()
            .filter(|s| s.match_id == match_id)
            .cloned()
            .collect())
    }

    async fn get_stat(&self, id: StatId) -> Result<Option<PlayerMatchStat>> {
        let tables = self.read()?;
        Ok(tables.stats.iter().find(|s| s.id == id).cloned())
    }

    async fn insert_stat(&self, stat: PlayerMatchStat) -> Result<()> {
        self.write()?.stats.push(stat);
        Ok(())
    }

    async fn update_stat(&self, stat: PlayerMatchStat) -> Result<()> {
        let mut tables = self.write()?;
        let stored = tables
            .stats
            .iter_mut()
            .find(|s| s.id == stat.id)
            .ok_or_else(|| KickerError::not_found("PlayerMatchStat", stat.id))?;
        *stored = stat;
        Ok(())
    }

    async fn delete_stat(&self, id: StatId) -> Result<()> {
        let mut tables = self.write()?;
        let before = tables.stats.len();
        tables.stats.retain(|s| s.id != id);
        if tables.stats.len() == before {
            return Err(KickerError::not_found("PlayerMatchStat", id).into());
        }
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        self.record_save()
    }
}
