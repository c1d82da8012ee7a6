//! Table registry
//!
//! Tracks which match is currently being played at each table and the
//! matches that were closed there.

use crate::error::{KickerError, Result};
use crate::store::TableStore;
use crate::types::{Match, MatchId, PlayTable, TableId};
use crate::utils::KeyedLocks;
use std::sync::Arc;
use tracing::{debug, info};

pub struct TableRegistry {
    table_store: Arc<dyn TableStore>,
    locks: KeyedLocks<TableId>,
}

impl TableRegistry {
    pub fn new(table_store: Arc<dyn TableStore>) -> Self {
        Self {
            table_store,
            locks: KeyedLocks::new(),
        }
    }

    /// Register a new table
    pub async fn create_table(&self, name: &str) -> Result<PlayTable> {
        let name = name.trim();
        if name.is_empty() {
            return Err(KickerError::invalid("Table name must not be blank").into());
        }

        let table = PlayTable::new(name);
        self.table_store.insert_table(table.clone()).await?;
        self.table_store.save().await?;

        info!("Created table '{}' ({})", table.name, table.id);
        Ok(table)
    }

    pub async fn get_table(&self, table_id: TableId) -> Result<PlayTable> {
        if table_id.is_nil() {
            return Err(KickerError::MissingArgument { name: "table" }.into());
        }
        self.table_store
            .get_table(table_id)
            .await?
            .ok_or_else(|| KickerError::not_found("Table", table_id).into())
    }

    /// Mark `match_id` as the match currently played at the table
    pub async fn open_match(&self, table_id: TableId, match_id: MatchId) -> Result<PlayTable> {
        let _guard = self.locks.lock(&table_id).await;
        let mut table = self.get_table(table_id).await?;

        if let Some(previous) = table.current_match.replace(match_id) {
            debug!(
                "Table {} switches current match from {} to {}",
                table_id, previous, match_id
            );
        }

        self.table_store.update_table(table.clone()).await?;
        self.table_store.save().await?;
        Ok(table)
    }

    /// Move the table's current match to its closed matches
    pub async fn close_match(&self, table_id: TableId, match_id: MatchId) -> Result<PlayTable> {
        let _guard = self.locks.lock(&table_id).await;
        let mut table = self.get_table(table_id).await?;

        if table.current_match != Some(match_id) {
            return Err(KickerError::invalid(format!(
                "Match {} is not the current match of table {}",
                match_id, table_id
            ))
            .into());
        }

        table.current_match = None;
        table.closed_matches.push(match_id);
        self.table_store.update_table(table.clone()).await?;
        self.table_store.save().await?;

        info!(
            "Table '{}' closed match {} ({} played)",
            table.name,
            match_id,
            table.closed_matches.len()
        );
        Ok(table)
    }

    /// Every match created for the table, oldest first
    pub async fn matches_for_table(&self, table_id: TableId) -> Result<Vec<Match>> {
        self.get_table(table_id).await?;
        self.table_store.list_matches_for_table(table_id).await
    }
}
