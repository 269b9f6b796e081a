//! High-score table over a pluggable key-value store.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const MAX_SCORES: usize = 100;
pub const STORAGE_KEY: &str = "bloonHighScores";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub name: String,
    pub score: u64,
    pub level: u32,
    /// Wall-clock milliseconds since the epoch.
    pub achieved_at_ms: u64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("score store unavailable: {0}")]
    Unavailable(String),
    #[error("score store corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Persistence for the ordered score list.
pub trait ScoreStore {
    fn load(&self) -> Result<Vec<ScoreRecord>, StoreError>;
    fn save(&mut self, records: &[ScoreRecord]) -> Result<(), StoreError>;
    fn clear(&mut self) -> Result<(), StoreError>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: Vec<ScoreRecord>,
}

impl ScoreStore for MemoryStore {
    fn load(&self) -> Result<Vec<ScoreRecord>, StoreError> {
        Ok(self.records.clone())
    }

    fn save(&mut self, records: &[ScoreRecord]) -> Result<(), StoreError> {
        self.records = records.to_vec();
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.records.clear();
        Ok(())
    }
}

/// Store failures are logged and otherwise ignored: an unreadable store reads as empty.
pub struct Leaderboard<S: ScoreStore> {
    store: S,
}

impl<S: ScoreStore> Leaderboard<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn records(&self) -> Vec<ScoreRecord> {
        self.store.load().unwrap_or_else(|e| {
            warn!(error = %e, "reading high scores failed");
            Vec::new()
        })
    }

    /// 1-based rank of the new entry, or `None` when the entry is rejected or doesn't
    /// make the table.
    pub fn add_score(&mut self, name: &str, score: u64, level: u32, achieved_at_ms: u64) -> Option<usize> {
        let name = name.trim();
        if name.is_empty() || score == 0 {
            return None;
        }
        let mut records = self.records();
        // Ties keep the older entry ahead.
        let rank = records.iter().take_while(|r| r.score >= score).count();
        records.insert(rank, ScoreRecord { name: name.to_string(), score, level, achieved_at_ms });
        records.truncate(MAX_SCORES);
        if let Err(e) = self.store.save(&records) {
            warn!(error = %e, "saving high scores failed");
        }
        debug!(name, score, level, rank = rank + 1, "score recorded");
        (rank < MAX_SCORES).then_some(rank + 1)
    }

    pub fn top_scores(&self, limit: usize) -> Vec<ScoreRecord> {
        let mut records = self.records();
        records.truncate(limit);
        records
    }

    /// Whether `score` would make the table.
    pub fn is_high_score(&self, score: u64) -> bool {
        let records = self.records();
        records.len() < MAX_SCORES || records.last().is_some_and(|r| score > r.score)
    }

    pub fn clear(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "clearing high scores failed");
        }
    }
}
