//! Importer orchestration
//!
//! An `Importer` is built once from a validated configuration and runs the
//! whole pipeline: resolve the sitemap (flattening indexes), drop duplicate
//! and rule-rejected URLs, then hand the rest to the incremental crawler.
//!
//! Rule patterns are compiled before anything else is set up, so an invalid
//! pattern fails construction without any network access.

use crate::config::Config;
use crate::convert::HtmlConverter;
use crate::crawler::{
    build_http_client, ConvertingFetcher, CrawlError, CrawlErrorKind, CrawledPage, CrawlerOptions,
    HttpPageFetcher, IncrementalCrawler, PageFetcher,
};
use crate::output::CrawlStats;
use crate::robots::RobotsGate;
use crate::rules::{CrawlRules, RuleEngine};
use crate::sitemap::{PageDescriptor, SitemapParser};
use crate::storage::{lock_store, open_state_store, shared, SharedStateStore};
use crate::Result;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    /// The sitemap URL the run started from
    pub source: String,
    pub stats: CrawlStats,
    /// New and updated pages; order is not meaningful
    pub pages: Vec<CrawledPage>,
    /// Child sitemap failures followed by per-page failures
    pub errors: Vec<CrawlError>,
    /// Distinct page URLs found in the sitemap
    pub total_urls: usize,
    /// URLs that passed the include/exclude rules
    pub filtered_urls: usize,
    /// URLs not started because the run budget ran out
    pub unscheduled: usize,
    pub budget_exhausted: bool,
    #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
    pub duration: Duration,
}

impl ImportResult {
    /// Percentage of processed pages that did not fail
    pub fn success_rate(&self) -> f64 {
        self.stats.success_rate()
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Runs imports for one configuration
pub struct Importer {
    source: String,
    rules: RuleEngine,
    parser: SitemapParser,
    store: SharedStateStore,
    crawler: IncrementalCrawler,
    force_refresh: bool,
}

impl Importer {
    /// Builds an importer that fetches pages over HTTP
    ///
    /// # Arguments
    ///
    /// * `config` - A validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Importer)` - Ready to run
    /// * `Err(TidemarkError)` - A rule pattern did not compile, the state
    ///   store could not be opened or the HTTP client could not be built
    pub fn new(config: Config) -> Result<Self> {
        let rules = RuleEngine::new(&CrawlRules::from(&config.rules))?;

        let page_timeout = Duration::from_secs(config.crawler.page_timeout_secs);
        let client = build_http_client(&config.user_agent, page_timeout)?;

        let mut http = HttpPageFetcher::new(client.clone(), page_timeout);
        if config.crawler.respect_robots {
            tracing::info!("Checking robots.txt before fetching pages");
            http = http.with_robots(RobotsGate::new(
                client,
                config.user_agent.name.clone(),
                page_timeout,
            ));
        }
        let fetcher = ConvertingFetcher::new(http, HtmlConverter::from_config(&config.converter));

        Self::assemble(config, rules, Arc::new(fetcher))
    }

    /// Builds an importer around a caller-supplied page fetcher
    ///
    /// Sitemaps are still fetched over HTTP.
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        let rules = RuleEngine::new(&CrawlRules::from(&config.rules))?;
        Self::assemble(config, rules, fetcher)
    }

    fn assemble(config: Config, rules: RuleEngine, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        let store = shared(open_state_store(&config.state)?);

        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.source.timeout_secs),
        )?;
        let parser =
            SitemapParser::with_client(client, Duration::from_secs(config.source.timeout_secs));

        let crawler = IncrementalCrawler::new(
            Arc::clone(&store),
            fetcher,
            CrawlerOptions::from(&config.crawler),
        );

        Ok(Self {
            source: config.source.sitemap_url,
            rules,
            parser,
            store,
            crawler,
            force_refresh: config.crawler.force_refresh,
        })
    }

    /// Overrides the configured `force-refresh` setting
    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    /// The state store this importer reads and writes
    pub fn store(&self) -> &SharedStateStore {
        &self.store
    }

    /// Runs one import
    ///
    /// Only a failure to read the root sitemap is returned as an error.
    /// Failing child sitemaps and failing pages are itemized in the result.
    pub async fn run(&self) -> Result<ImportResult> {
        let started = Instant::now();
        tracing::info!("Importing from {}", self.source);

        let resolved = self.parser.resolve(&self.source).await?;
        tracing::info!(
            "Read {} sitemap documents with {} entries",
            resolved.documents,
            resolved.descriptors.len()
        );

        let unique = dedupe(resolved.descriptors);
        let total_urls = unique.len();
        let selected: Vec<PageDescriptor> = unique
            .into_iter()
            .filter(|descriptor| self.rules.should_crawl(&descriptor.loc))
            .collect();
        tracing::info!("{} of {} URLs match the rules", selected.len(), total_urls);

        let report = self.crawler.crawl(&selected, self.force_refresh).await;

        let mut errors: Vec<CrawlError> = resolved
            .failures
            .iter()
            .map(|failure| {
                CrawlError::new(&failure.origin, CrawlErrorKind::Sitemap, failure.cause.to_string())
            })
            .collect();
        errors.extend(report.errors);

        Ok(ImportResult {
            source: self.source.clone(),
            stats: report.stats,
            pages: report.pages,
            errors,
            total_urls,
            filtered_urls: selected.len(),
            unscheduled: report.unscheduled,
            budget_exhausted: report.budget_exhausted,
            duration: started.elapsed(),
        })
    }

    /// Resolves the sitemap and returns the URLs that pass the rules
    ///
    /// No page is fetched and no state changes.
    pub async fn filtered_urls(&self) -> Result<Vec<String>> {
        let resolved = self.parser.resolve(&self.source).await?;
        let unique = dedupe(resolved.descriptors);
        Ok(self
            .rules
            .filter(unique.iter().map(|descriptor| descriptor.loc.as_str()))
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    /// Forgets every URL in the state store
    pub fn reset_state(&self) -> Result<()> {
        let mut store = lock_store(&self.store)?;
        let known = store.len()?;
        store.clear()?;
        tracing::info!("Cleared crawl state for {} URLs", known);
        Ok(())
    }
}

/// Drops repeated `loc` values, keeping the first occurrence
fn dedupe(descriptors: Vec<PageDescriptor>) -> Vec<PageDescriptor> {
    let mut seen = HashSet::new();
    descriptors
        .into_iter()
        .filter(|descriptor| seen.insert(descriptor.loc.clone()))
        .collect()
}
