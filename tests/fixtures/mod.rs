//! Test fixtures and store wrappers for integration testing
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use kicker_stats::config::{MatchRules, RatingConfig};
use kicker_stats::error::Result;
use kicker_stats::store::{InMemoryStore, Page, RatingHistoryStore, RatingStore};
use kicker_stats::types::{
    Match, PlayTable, PlayerId, PlayerPoints, Rating, RatingHistory, RatingHistoryId, RatingId,
};
use kicker_stats::{MarginEloCalculator, MatchLifecycleManager, RatingEngine, TableRegistry};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Every component of the kicker core on top of one in-memory store
pub struct TestSystem {
    pub store: Arc<InMemoryStore>,
    pub tables: TableRegistry,
    pub matches: MatchLifecycleManager,
    pub ratings: RatingEngine,
}

pub fn create_test_system() -> TestSystem {
    create_test_system_with(MatchRules::default(), RatingConfig::default())
}

pub fn create_test_system_with(rules: MatchRules, rating: RatingConfig) -> TestSystem {
    let store = Arc::new(InMemoryStore::new());
    let calculator = MarginEloCalculator::new(rating).unwrap();

    TestSystem {
        tables: TableRegistry::new(store.clone()),
        matches: MatchLifecycleManager::new(store.clone(), store.clone(), store.clone(), rules),
        ratings: RatingEngine::new(store.clone(), store.clone(), Arc::new(calculator)),
        store,
    }
}

pub fn new_players(count: usize) -> Vec<PlayerId> {
    (0..count).map(|_| Uuid::new_v4()).collect()
}

impl TestSystem {
    pub async fn create_table(&self, name: &str) -> PlayTable {
        self.tables.create_table(name).await.unwrap()
    }

    /// Give each player a rating, in order
    pub async fn seed_ratings(&self, players: &[PlayerId], scores: &[i32]) {
        for (player, score) in players.iter().zip(scores) {
            RatingStore::insert_rating(self.store.as_ref(), Rating::new(*player, *score))
                .await
                .unwrap();
        }
    }

    /// An open match with the first two players on team 1 and the rest on team 2
    pub async fn full_match(&self, table: &PlayTable, players: &[PlayerId]) -> Match {
        let m = self.matches.create_match(table.id, Utc::now()).await.unwrap();
        for (i, player) in players.iter().enumerate() {
            let team = if i < 2 { 1 } else { 2 };
            self.matches.join_match(m.id, *player, team).await.unwrap();
        }
        self.matches.get_match(m.id).await.unwrap()
    }

    /// Play a full match through to Finished
    pub async fn finished_match(
        &self,
        table: &PlayTable,
        players: &[PlayerId],
        score_a: u32,
        score_b: u32,
    ) -> Match {
        let m = self.full_match(table, players).await;
        self.matches.start_match(m.id).await.unwrap();
        let stats: Vec<PlayerPoints> = players.iter().map(|p| PlayerPoints::new(*p, 1)).collect();
        self.matches
            .close_match(m.id, score_a, score_b, &stats)
            .await
            .unwrap()
    }
}

/// Rating and history store that records the order of every write
#[derive(Default)]
pub struct RecordingRatingStore {
    inner: InMemoryStore,
    operations: Mutex<Vec<&'static str>>,
}

impl RecordingRatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.operations
            .lock()
            .map(|ops| ops.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut ops) = self.operations.lock() {
            ops.clear();
        }
    }

    fn record(&self, operation: &'static str) {
        if let Ok(mut ops) = self.operations.lock() {
            ops.push(operation);
        }
    }
}

#[async_trait]
impl RatingStore for RecordingRatingStore {
    async fn get_rating(&self, id: RatingId) -> Result<Option<Rating>> {
        RatingStore::get_rating(&self.inner, id).await
    }

    async fn get_current_rating(&self, player_id: PlayerId) -> Result<Option<Rating>> {
        self.inner.get_current_rating(player_id).await
    }

    async fn insert_rating(&self, rating: Rating) -> Result<()> {
        self.record("insert_rating");
        self.inner.insert_rating(rating).await
    }

    async fn update_rating(&self, rating: Rating) -> Result<()> {
        self.record("update_rating");
        self.inner.update_rating(rating).await
    }

    async fn delete_rating(&self, id: RatingId) -> Result<()> {
        self.record("delete_rating");
        self.inner.delete_rating(id).await
    }

    async fn save(&self) -> Result<()> {
        self.record("save_ratings");
        RatingStore::save(&self.inner).await
    }
}

#[async_trait]
impl RatingHistoryStore for RecordingRatingStore {
    async fn get_history(&self, id: RatingHistoryId) -> Result<Option<RatingHistory>> {
        self.inner.get_history(id).await
    }

    async fn list_history(&self, player_id: PlayerId, page: Page) -> Result<Vec<RatingHistory>> {
        self.inner.list_history(player_id, page).await
    }

    async fn insert_history(&self, entry: RatingHistory) -> Result<()> {
        self.record("insert_history");
        self.inner.insert_history(entry).await
    }

    async fn delete_history(&self, id: RatingHistoryId) -> Result<()> {
        self.record("delete_history");
        self.inner.delete_history(id).await
    }

    async fn save(&self) -> Result<()> {
        self.record("save_history");
        RatingHistoryStore::save(&self.inner).await
    }
}

