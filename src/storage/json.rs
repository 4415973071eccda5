//! JSON file state store
//!
//! The backing file is a flat object mapping each URL to
//! `{"last_crawl": "<RFC 3339>", "content_hash": "<hex>"}`. It is read once
//! when the store is opened and rewritten atomically on every save. A write
//! that fails leaves the in-memory map as it was before the call.

use crate::state::CrawlState;
use crate::storage::traits::{StateStore, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    last_crawl: Option<DateTime<Utc>>,
    content_hash: Option<String>,
}

/// Crawl state persisted as a JSON document
#[derive(Debug)]
pub struct JsonStateStore {
    path: PathBuf,
    entries: BTreeMap<String, StoredEntry>,
}

impl JsonStateStore {
    /// Opens the store at `path`
    ///
    /// A missing file starts an empty store. An unreadable or corrupt file is
    /// logged and also starts an empty store; it is replaced on the next save.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = load_entries(&path);
        tracing::debug!(
            "Loaded {} crawl states from {}",
            entries.len(),
            path.display()
        );
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the whole map to a temp file, syncs it and renames it into place
    fn flush(&self) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let body = serde_json::to_vec_pretty(&self.entries)?;
        let tmp = temp_path(&self.path);

        let mut file = File::create(&tmp)?;
        file.write_all(&body)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn load_entries(path: &Path) -> BTreeMap<String, StoredEntry> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            tracing::warn!(
                "Could not read state file {}: {}; starting with empty state",
                path.display(),
                e
            );
            return BTreeMap::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(
                "State file {} is corrupt ({}); starting with empty state",
                path.display(),
                e
            );
            BTreeMap::new()
        }
    }
}

impl StateStore for JsonStateStore {
    fn name(&self) -> &'static str {
        "json"
    }

    fn get_state(&self, url: &str) -> StorageResult<Option<CrawlState>> {
        Ok(self.entries.get(url).map(|entry| CrawlState {
            url: url.to_string(),
            last_crawl: entry.last_crawl,
            content_hash: entry.content_hash.clone(),
        }))
    }

    fn save_state(&mut self, state: CrawlState) -> StorageResult<()> {
        let url = state.url;
        let previous = self.entries.insert(
            url.clone(),
            StoredEntry {
                last_crawl: state.last_crawl,
                content_hash: state.content_hash,
            },
        );

        if let Err(e) = self.flush() {
            match previous {
                Some(entry) => self.entries.insert(url, entry),
                None => self.entries.remove(&url),
            };
            return Err(e);
        }
        Ok(())
    }

    fn all_states(&self) -> StorageResult<Vec<CrawlState>> {
        Ok(self
            .entries
            .iter()
            .map(|(url, entry)| CrawlState {
                url: url.clone(),
                last_crawl: entry.last_crawl,
                content_hash: entry.content_hash.clone(),
            })
            .collect())
    }

    fn remove_state(&mut self, url: &str) -> StorageResult<bool> {
        let Some(entry) = self.entries.remove(url) else {
            return Ok(false);
        };

        if let Err(e) = self.flush() {
            self.entries.insert(url.to_string(), entry);
            return Err(e);
        }
        Ok(true)
    }

    fn clear(&mut self) -> StorageResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.entries.clear();
        Ok(())
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.entries.len())
    }
}
