//! Crawler module for incremental page processing
//!
//! This module contains the core crawling logic, including:
//! - The `PageFetcher` collaborator and its HTTP implementation
//! - HTML to markdown conversion on the fetch path
//! - The per-URL new/updated/skipped/failed decision and state updates

mod fetcher;
mod incremental;

pub use fetcher::{
    build_http_client, ConvertingFetcher, FetchError, FetchedDocument, HttpPageFetcher,
    PageFetcher,
};
pub use incremental::{
    CrawlError, CrawlErrorKind, CrawlReport, CrawledPage, CrawlerOptions, IncrementalCrawler,
};
