//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the StateStore trait.

use crate::state::CrawlState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StateStore, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// SQLite crawl state backend
pub struct SqliteStateStore {
    conn: Connection,
}

impl SqliteStateStore {
    /// Opens or creates the database at `path`
    ///
    /// A file that exists but cannot be used as a crawl state database is
    /// renamed to `<path>.corrupt` and a fresh, empty database is created in
    /// its place.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStateStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - The database could not be created even after quarantine
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        match open_connection(path) {
            Ok(conn) => Ok(Self { conn }),
            Err(e) if path.exists() => {
                let quarantine = quarantine_path(path);
                tracing::warn!(
                    "State database {} is unusable ({}); moving it to {} and starting with empty state",
                    path.display(),
                    e,
                    quarantine.display()
                );
                fs::rename(path, &quarantine)?;
                Ok(Self {
                    conn: open_connection(path)?,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn open_connection(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;

    // Every save must be on disk before it returns
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = FULL;
    ",
    )?;

    initialize_schema(&conn)?;
    conn.query_row("SELECT COUNT(*) FROM crawl_state", [], |row| {
        row.get::<_, i64>(0)
    })?;

    Ok(conn)
}

fn quarantine_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}

fn row_to_state(row: &Row<'_>) -> rusqlite::Result<CrawlState> {
    let last_crawl: Option<String> = row.get(1)?;
    Ok(CrawlState {
        url: row.get(0)?,
        last_crawl: last_crawl
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        content_hash: row.get(2)?,
    })
}

impl StateStore for SqliteStateStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn get_state(&self, url: &str) -> StorageResult<Option<CrawlState>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url, last_crawl, content_hash FROM crawl_state WHERE url = ?1")?;

        let state = stmt.query_row(params![url], row_to_state).optional()?;
        Ok(state)
    }

    fn save_state(&mut self, state: CrawlState) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO crawl_state (url, last_crawl, content_hash) VALUES (?1, ?2, ?3)
             ON CONFLICT(url) DO UPDATE SET
                 last_crawl = excluded.last_crawl,
                 content_hash = excluded.content_hash",
            params![
                state.url,
                state.last_crawl.map(|dt| dt.to_rfc3339()),
                state.content_hash
            ],
        )?;
        Ok(())
    }

    fn all_states(&self) -> StorageResult<Vec<CrawlState>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url, last_crawl, content_hash FROM crawl_state ORDER BY url")?;

        let states = stmt
            .query_map([], row_to_state)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(states)
    }

    fn remove_state(&mut self, url: &str) -> StorageResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM crawl_state WHERE url = ?1", params![url])?;
        Ok(removed > 0)
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM crawl_state", [])?;
        Ok(())
    }

    fn len(&self) -> StorageResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM crawl_state", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
