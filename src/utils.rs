//! Utility functions for the kicker core

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Generate a new unique entity ID
pub fn generate_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Arithmetic mean of integer ratings, `None` for an empty slice
pub fn mean_rating(scores: &[i32]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().map(|s| *s as f64).sum::<f64>() / scores.len() as f64)
}

/// Table of async mutexes keyed by entity id.
///
/// Holding the guard returned by [`KeyedLocks::lock`] gives exclusive access to
/// that key; other keys are unaffected.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    pub async fn lock(&self, key: &K) -> tokio::sync::OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // Entries nobody holds or waits on can go
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key.clone()).or_default().clone()
        };
        entry.lock_owned().await
    }

    /// Lock several keys. Keys are sorted and deduplicated first so that two
    /// callers locking overlapping sets cannot deadlock.
    pub async fn lock_many(&self, keys: &[K]) -> Vec<tokio::sync::OwnedMutexGuard<()>>
    where
        K: Ord,
    {
        let mut ordered: Vec<K> = keys.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for key in &ordered {
            guards.push(self.lock(key).await);
        }
        guards
    }

    /// Number of keys with a live lock entry
    pub fn tracked_keys(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}
