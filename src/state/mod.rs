//! State module for incremental crawling
//!
//! # Components
//!
//! - `CrawlState`: What the state store remembers per URL (last crawl, content hash)
//! - `CrawlOutcome`: How a URL was classified during a run (new, updated, skipped, failed)

mod crawl_state;
mod outcome;

// Re-export main types
pub use crawl_state::{content_hash, page_id, CrawlState};
pub use outcome::CrawlOutcome;
