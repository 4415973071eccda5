//! In-memory state store
//!
//! State lives for the lifetime of the process only. Used for one-shot runs
//! and tests.

use crate::state::CrawlState;
use crate::storage::traits::{StateStore, StorageResult};
use std::collections::BTreeMap;

/// Process-lifetime crawl state
#[derive(Debug, Default, Clone)]
pub struct MemoryStateStore {
    states: BTreeMap<String, CrawlState>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get_state(&self, url: &str) -> StorageResult<Option<CrawlState>> {
        Ok(self.states.get(url).cloned())
    }

    fn save_state(&mut self, state: CrawlState) -> StorageResult<()> {
        self.states.insert(state.url.clone(), state);
        Ok(())
    }

    fn all_states(&self) -> StorageResult<Vec<CrawlState>> {
        Ok(self.states.values().cloned().collect())
    }

    fn remove_state(&mut self, url: &str) -> StorageResult<bool> {
        Ok(self.states.remove(url).is_some())
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.states.clear();
        Ok(())
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.states.len())
    }
}
