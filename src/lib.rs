//! Tidemark: an incremental sitemap importer
//!
//! This crate enumerates pages from a sitemap (or sitemap index), filters them
//! through include/exclude rules, tracks per-URL crawl state so unchanged pages
//! are not processed twice, converts fetched HTML into markdown text and
//! reports what changed during a run.

pub mod config;
pub mod convert;
pub mod crawler;
pub mod importer;
pub mod output;
pub mod robots;
pub mod rules;
pub mod sitemap;
pub mod state;
pub mod storage;

use std::fmt;
use thiserror::Error;

/// Main error type for Tidemark operations
#[derive(Debug, Error)]
pub enum TidemarkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// The flavour of a rule pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Glob,
    Regex,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Glob => f.write_str("glob"),
            Self::Regex => f.write_str("regex"),
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid {kind} pattern '{pattern}': {message}")]
    InvalidPattern {
        pattern: String,
        kind: PatternKind,
        message: String,
    },
}

/// Why a sitemap document could not be turned into descriptors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCause {
    /// The descriptor fetch exceeded its timeout
    Timeout,
    /// The server could not be reached
    Connection(String),
    /// The server answered with a non-success status
    Http(u16),
    /// Any other transport failure
    Request(String),
    /// The payload looked like (or was declared as) gzip but did not inflate
    InvalidGzip(String),
    /// The payload is not valid text
    Undecodable(String),
    /// The XML is not well formed
    MalformedXml(String),
    /// `parse` was handed a sitemap index
    SitemapIndex,
    /// Sitemap indexes nested deeper than the resolver follows
    IndexDepthExceeded(u8),
}

impl fmt::Display for ParseCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("request timed out"),
            Self::Connection(e) => write!(f, "connection error: {}", e),
            Self::Http(status) => write!(f, "HTTP error status {}", status),
            Self::Request(e) => write!(f, "request failed: {}", e),
            Self::InvalidGzip(e) => write!(f, "invalid gzip stream: {}", e),
            Self::Undecodable(e) => write!(f, "unable to decode content as text: {}", e),
            Self::MalformedXml(e) => write!(f, "invalid XML: {}", e),
            Self::SitemapIndex => f.write_str(
                "document is a sitemap index, not a sitemap; use parse_index() instead",
            ),
            Self::IndexDepthExceeded(max) => {
                write!(f, "sitemap index nesting exceeds depth {}", max)
            }
        }
    }
}

/// Failure to fetch, decode or parse a sitemap document
///
/// `origin` is the URL the document came from, or `<inline>` for content
/// handed to the parser directly.
#[derive(Debug, Clone, Error)]
#[error("Sitemap parse error ({origin}): {cause}")]
pub struct ParseError {
    pub origin: String,
    pub cause: ParseCause,
}

impl ParseError {
    /// Origin label used for content that did not come from a URL
    pub const INLINE: &'static str = "<inline>";

    pub fn new(origin: impl Into<String>, cause: ParseCause) -> Self {
        Self {
            origin: origin.into(),
            cause,
        }
    }

    /// Returns true if the document was a sitemap index handed to `parse`
    pub fn is_sitemap_index(&self) -> bool {
        matches!(self.cause, ParseCause::SitemapIndex)
    }
}

/// Result type alias for Tidemark operations
pub type Result<T> = std::result::Result<T, TidemarkError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for sitemap parsing
pub type ParseResult<T> = std::result::Result<T, ParseError>;

// Re-export commonly used types
pub use config::Config;
pub use convert::HtmlConverter;
pub use crawler::{CrawlReport, IncrementalCrawler, PageFetcher};
pub use importer::{ImportResult, Importer};
pub use output::CrawlStats;
pub use rules::{CrawlRules, RuleEngine};
pub use sitemap::{PageDescriptor, SitemapParser};
pub use state::{CrawlOutcome, CrawlState};
pub use storage::{JsonStateStore, MemoryStateStore, SqliteStateStore, StateStore};
