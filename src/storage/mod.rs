//! Storage module for persisting crawl state
//!
//! This module handles every crawl state backend, including:
//! - The `StateStore` capability interface (get/save/clear)
//! - An in-memory backend for one-shot runs and tests
//! - A JSON file backend with atomic rewrites
//! - A SQLite backend with corrupt-file quarantine

mod json;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use json::JsonStateStore;
pub use memory::MemoryStateStore;
pub use sqlite::SqliteStateStore;
pub use traits::{StateStore, StorageError, StorageResult};

use crate::config::{StateBackend, StateConfig};
use std::sync::{Arc, Mutex, MutexGuard};

/// A state store shared between concurrent crawl tasks
///
/// Every access goes through the mutex, so saves for different URLs are
/// serialized. The lock is never held across an await point.
pub type SharedStateStore = Arc<Mutex<Box<dyn StateStore>>>;

/// Wraps a store so it can be handed to the crawler
pub fn shared(store: Box<dyn StateStore>) -> SharedStateStore {
    Arc::new(Mutex::new(store))
}

/// Locks a shared store, mapping a poisoned lock to a storage error
pub fn lock_store(store: &SharedStateStore) -> StorageResult<MutexGuard<'_, Box<dyn StateStore>>> {
    store.lock().map_err(|_| StorageError::LockPoisoned)
}

/// Opens the backend selected by the configuration
///
/// # Arguments
///
/// * `config` - The `[state]` section of the configuration
///
/// # Returns
///
/// * `Ok(Box<dyn StateStore>)` - The opened store
/// * `Err(StorageError)` - The backend could not be opened
pub fn open_state_store(config: &StateConfig) -> StorageResult<Box<dyn StateStore>> {
    let store: Box<dyn StateStore> = match (config.backend, config.path.as_deref()) {
        (StateBackend::Memory, _) => Box::new(MemoryStateStore::new()),
        (StateBackend::Json, Some(path)) => Box::new(JsonStateStore::open(path)),
        (StateBackend::Sqlite, Some(path)) => Box::new(SqliteStateStore::open(path)?),
        (backend, None) => {
            return Err(StorageError::Database(format!(
                "no state path configured for the {:?} backend",
                backend
            )))
        }
    };

    tracing::info!(
        "Using {} crawl state store ({} known URLs)",
        store.name(),
        store.len()?
    );
    Ok(store)
}
