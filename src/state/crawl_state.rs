/// Per-URL crawl state records
///
/// A `CrawlState` is what the state store remembers about a URL between runs:
/// when it was last fetched and a digest of the content seen at that time.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Persisted knowledge about one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlState {
    /// The URL this record belongs to
    pub url: String,

    /// When the URL was last fetched successfully
    pub last_crawl: Option<DateTime<Utc>>,

    /// Hex digest of the content seen at `last_crawl`
    pub content_hash: Option<String>,
}

impl CrawlState {
    /// Creates a record for a fetch that just completed
    pub fn fetched(url: impl Into<String>, content_hash: impl Into<String>) -> Self {
        Self::fetched_at(url, content_hash, Utc::now())
    }

    /// Creates a record for a fetch that completed at `at`
    pub fn fetched_at(
        url: impl Into<String>,
        content_hash: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            url: url.into(),
            last_crawl: Some(at),
            content_hash: Some(content_hash.into()),
        }
    }

    /// Returns true if a descriptor `lastmod` says nothing changed since the last crawl
    ///
    /// Without either timestamp nothing can be concluded and this is false.
    pub fn is_current(&self, lastmod: Option<DateTime<Utc>>) -> bool {
        match (lastmod, self.last_crawl) {
            (Some(lastmod), Some(last_crawl)) => lastmod <= last_crawl,
            _ => false,
        }
    }

    /// Returns true if the stored digest equals `hash`
    pub fn has_hash(&self, hash: &str) -> bool {
        self.content_hash.as_deref() == Some(hash)
    }
}

/// Computes the SHA-256 hex digest used as a page content hash
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Derives a stable 16 character identifier for a URL
pub fn page_id(url: &str) -> String {
    let mut id = content_hash(url);
    id.truncate(16);
    id
}
