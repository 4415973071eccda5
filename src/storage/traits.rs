//! Storage traits and error types
//!
//! This module defines the capability interface every crawl state backend
//! implements, and the errors those backends report.

use crate::state::CrawlState;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("State store lock poisoned")]
    LockPoisoned,
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for crawl state backends
///
/// The store is the only authority on whether a URL has been seen and what
/// its content hash was. Implementations that persist to disk must have the
/// change on disk by the time `save_state` returns.
pub trait StateStore: Send {
    /// Short backend name used in log messages
    fn name(&self) -> &'static str;

    /// Looks up the state recorded for a URL
    ///
    /// # Returns
    ///
    /// * `Ok(Some(state))` - The URL has been crawled before
    /// * `Ok(None)` - The URL is unknown
    fn get_state(&self, url: &str) -> StorageResult<Option<CrawlState>>;

    /// Inserts or replaces the state for `state.url`
    fn save_state(&mut self, state: CrawlState) -> StorageResult<()>;

    /// Returns every stored record, ordered by URL
    fn all_states(&self) -> StorageResult<Vec<CrawlState>>;

    /// Forgets a single URL
    ///
    /// # Returns
    ///
    /// `true` if a record was removed
    fn remove_state(&mut self, url: &str) -> StorageResult<bool>;

    /// Forgets every URL
    fn clear(&mut self) -> StorageResult<()>;

    /// Number of stored records
    fn len(&self) -> StorageResult<usize> {
        Ok(self.all_states()?.len())
    }

    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}
