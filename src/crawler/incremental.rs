//! Incremental crawling
//!
//! The crawler takes page descriptors that already passed the rules and
//! decides per URL whether the page has to be fetched. Fetches go through a
//! `PageFetcher` on a bounded number of concurrent tasks.
//!
//! Per entry:
//! 1. `force_refresh` always fetches; the page is `updated` if it was known
//!    before and `new` otherwise.
//! 2. An unknown URL is fetched and classified `new`.
//! 3. A `lastmod` at or before the stored `last_crawl` is skipped without a
//!    request.
//! 4. Anything else is fetched and hashed. A matching hash is `skipped`, a
//!    different one `updated`.
//!
//! Every successful fetch stores `{last_crawl: now, content_hash}`. A failed
//! fetch leaves the stored state untouched and is recorded as an error.

use crate::config::CrawlerConfig;
use crate::convert::title_from_url;
use crate::crawler::fetcher::{FetchError, PageFetcher};
use crate::output::CrawlStats;
use crate::sitemap::PageDescriptor;
use crate::state::{content_hash, page_id, CrawlOutcome, CrawlState};
use crate::storage::{lock_store, SharedStateStore, StorageResult};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tuning knobs for a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlerOptions {
    /// Upper bound on pages fetched at the same time
    pub max_concurrent: usize,
    /// Timeout applied around each page fetch
    pub page_timeout: Duration,
    /// Stop starting new entries once this much time has passed
    pub run_budget: Option<Duration>,
}

impl Default for CrawlerOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            page_timeout: Duration::from_secs(30),
            run_budget: None,
        }
    }
}

impl From<&CrawlerConfig> for CrawlerOptions {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent_pages.max(1) as usize,
            page_timeout: Duration::from_secs(config.page_timeout_secs),
            run_budget: config.run_budget_secs.map(Duration::from_secs),
        }
    }
}

/// A page whose content was fetched during this run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawledPage {
    /// Stable identifier derived from the URL
    pub id: String,
    pub url: String,
    pub title: String,
    /// Converted page text
    pub content: String,
    pub content_hash: String,
    pub fetched_at: DateTime<Utc>,
    /// `lastmod` from the sitemap entry, if any
    pub lastmod: Option<DateTime<Utc>>,
    /// Either `new` or `updated`
    pub status: CrawlOutcome,
}

/// What went wrong with one URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlErrorKind {
    Fetch,
    Timeout,
    Storage,
    Sitemap,
}

impl fmt::Display for CrawlErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetch => "fetch",
            Self::Timeout => "timeout",
            Self::Storage => "storage",
            Self::Sitemap => "sitemap",
        };
        f.write_str(name)
    }
}

/// An itemized per-URL failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlError {
    pub url: String,
    pub kind: CrawlErrorKind,
    pub message: String,
}

impl CrawlError {
    pub fn new(url: impl Into<String>, kind: CrawlErrorKind, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            message: message.into(),
        }
    }

    fn from_fetch(url: &str, error: &FetchError) -> Self {
        let kind = if error.is_timeout() {
            CrawlErrorKind::Timeout
        } else {
            CrawlErrorKind::Fetch
        };
        Self::new(url, kind, error.to_string())
    }
}

/// Everything one call to `crawl` produced
///
/// `pages` holds only `new` and `updated` pages, in completion order.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub pages: Vec<CrawledPage>,
    pub stats: CrawlStats,
    pub errors: Vec<CrawlError>,
    /// Entries never started because the run budget ran out
    pub unscheduled: usize,
    pub budget_exhausted: bool,
}

/// What to do with an entry before any network access
#[derive(Debug, Clone, PartialEq)]
enum Decision {
    /// The descriptor says nothing changed since the last crawl
    Skip,
    /// Fetch the page; `previous` is the stored state, if any
    Fetch { previous: Option<CrawlState> },
}

fn decide(descriptor: &PageDescriptor, state: Option<CrawlState>, force_refresh: bool) -> Decision {
    match state {
        Some(state) if !force_refresh && state.is_current(descriptor.lastmod) => Decision::Skip,
        previous => Decision::Fetch { previous },
    }
}

/// Classifies a successful fetch against the stored state
fn classify(previous: Option<&CrawlState>, hash: &str, force_refresh: bool) -> CrawlOutcome {
    match previous {
        None => CrawlOutcome::New,
        Some(_) if force_refresh => CrawlOutcome::Updated,
        Some(state) if state.has_hash(hash) => CrawlOutcome::Skipped,
        Some(_) => CrawlOutcome::Updated,
    }
}

/// Result of processing one entry
enum EntryResult {
    NotStarted,
    Processed {
        stats: CrawlStats,
        page: Option<CrawledPage>,
        error: Option<CrawlError>,
    },
}

impl EntryResult {
    fn skipped() -> Self {
        Self::Processed {
            stats: CrawlStats::from(CrawlOutcome::Skipped),
            page: None,
            error: None,
        }
    }

    fn failed(error: CrawlError) -> Self {
        Self::Processed {
            stats: CrawlStats::from(CrawlOutcome::Failed),
            page: None,
            error: Some(error),
        }
    }
}

/// Crawls descriptors against a shared state store
pub struct IncrementalCrawler {
    store: SharedStateStore,
    fetcher: Arc<dyn PageFetcher>,
    options: CrawlerOptions,
}

impl IncrementalCrawler {
    /// Creates a crawler
    ///
    /// # Arguments
    ///
    /// * `store` - The state store, shared with whoever owns it
    /// * `fetcher` - Retrieves page content
    /// * `options` - Concurrency and timeout settings
    pub fn new(store: SharedStateStore, fetcher: Arc<dyn PageFetcher>, options: CrawlerOptions) -> Self {
        Self {
            store,
            fetcher,
            options,
        }
    }

    /// Processes every descriptor and returns what happened
    ///
    /// Never fails: per-URL problems become `failed` entries in the report,
    /// and an exhausted run budget stops new entries from starting.
    pub async fn crawl(&self, descriptors: &[PageDescriptor], force_refresh: bool) -> CrawlReport {
        let started = Instant::now();
        let deadline = self.options.run_budget.map(|budget| started + budget);

        tracing::info!(
            "Crawling {} entries ({} concurrent{})",
            descriptors.len(),
            self.options.max_concurrent,
            if force_refresh { ", forced refresh" } else { "" }
        );

        let mut results = stream::iter(descriptors)
            .map(|descriptor| self.process_entry(descriptor, force_refresh, deadline))
            .buffer_unordered(self.options.max_concurrent.max(1));

        let mut report = CrawlReport::default();
        while let Some(result) = results.next().await {
            match result {
                EntryResult::NotStarted => report.unscheduled += 1,
                EntryResult::Processed { stats, page, error } => {
                    // Entries finish in any order; merging counters is commutative
                    report.stats.merge(&stats);
                    report.pages.extend(page);
                    report.errors.extend(error);
                }
            }
        }

        if report.unscheduled > 0 {
            report.budget_exhausted = true;
            tracing::warn!(
                "Run budget exhausted, {} entries not started",
                report.unscheduled
            );
        }

        tracing::info!(
            "Crawl finished in {:.2}s: {} new, {} updated, {} skipped, {} failed",
            started.elapsed().as_secs_f64(),
            report.stats.new_pages,
            report.stats.updated_pages,
            report.stats.skipped_pages,
            report.stats.failed_pages
        );

        report
    }

    async fn process_entry(
        &self,
        descriptor: &PageDescriptor,
        force_refresh: bool,
        deadline: Option<Instant>,
    ) -> EntryResult {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return EntryResult::NotStarted;
        }

        let url = descriptor.loc.as_str();
        let state = match self.load_state(url) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("Could not read state for {}: {}", url, e);
                return EntryResult::failed(CrawlError::new(url, CrawlErrorKind::Storage, e.to_string()));
            }
        };

        let previous = match decide(descriptor, state, force_refresh) {
            Decision::Skip => {
                tracing::debug!("Skipping {} (lastmod not newer than last crawl)", url);
                return EntryResult::skipped();
            }
            Decision::Fetch { previous } => previous,
        };

        let fetched = match tokio::time::timeout(self.options.page_timeout, self.fetcher.fetch(url)).await {
            Ok(Ok(document)) => document,
            Ok(Err(e)) => {
                tracing::warn!("Failed to fetch {}: {}", url, e);
                return EntryResult::failed(CrawlError::from_fetch(url, &e));
            }
            Err(_) => {
                tracing::warn!(
                    "Fetching {} timed out after {:?}",
                    url,
                    self.options.page_timeout
                );
                return EntryResult::failed(CrawlError::from_fetch(url, &FetchError::Timeout));
            }
        };

        let hash = content_hash(&fetched.content);
        let outcome = classify(previous.as_ref(), &hash, force_refresh);
        let fetched_at = Utc::now();

        if let Err(e) = self.save_state(CrawlState::fetched_at(url, hash.clone(), fetched_at)) {
            tracing::warn!("Could not save state for {}: {}", url, e);
            return EntryResult::failed(CrawlError::new(url, CrawlErrorKind::Storage, e.to_string()));
        }

        tracing::debug!("{} -> {}", url, outcome);

        if !outcome.has_content() {
            return EntryResult::skipped();
        }

        let page = CrawledPage {
            id: page_id(url),
            url: url.to_string(),
            title: fetched.title.unwrap_or_else(|| title_from_url(url)),
            content: fetched.content,
            content_hash: hash,
            fetched_at,
            lastmod: descriptor.lastmod,
            status: outcome,
        };

        EntryResult::Processed {
            stats: CrawlStats::from(outcome),
            page: Some(page),
            error: None,
        }
    }

    fn load_state(&self, url: &str) -> StorageResult<Option<CrawlState>> {
        lock_store(&self.store)?.get_state(url)
    }

    fn save_state(&self, state: CrawlState) -> StorageResult<()> {
        lock_store(&self.store)?.save_state(state)
    }
}
