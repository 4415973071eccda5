//! Sitemap descriptor parsing
//!
//! This module turns sitemap and sitemap-index documents into page
//! descriptors, including:
//! - Fetching documents over HTTP with a per-request timeout
//! - Transparent gzip handling (detected by magic bytes)
//! - Namespaced and unnamespaced `<urlset>` / `<sitemapindex>` schemas
//! - Resolving sitemap indexes into a flat list of descriptors
//!
//! # Example
//!
//! ```
//! use tidemark::sitemap::parse_content;
//!
//! let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url><loc>https://example.com/docs/intro</loc><lastmod>2024-01-15</lastmod></url>
//! </urlset>"#;
//!
//! let descriptors = parse_content(xml, false).unwrap();
//! assert_eq!(descriptors[0].loc, "https://example.com/docs/intro");
//! ```

mod decode;
mod fields;
mod xml;

pub use decode::{decode_document, is_gzip};
pub use fields::{parse_lastmod, parse_priority, ChangeFrequency};
pub use xml::SITEMAP_NS;

use crate::{ParseCause, ParseError, ParseResult};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Deepest chain of nested sitemap indexes that `resolve` follows
pub const MAX_INDEX_DEPTH: u8 = 2;

/// One `<url>` entry of a sitemap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDescriptor {
    /// Page URL, never empty
    pub loc: String,
    /// Last modification time, if present and parseable
    pub lastmod: Option<DateTime<Utc>>,
    /// Change frequency hint, if present and known
    pub changefreq: Option<ChangeFrequency>,
    /// Priority in `[0.0, 1.0]`, if present and in range
    pub priority: Option<f32>,
}

impl PageDescriptor {
    /// Creates a descriptor with no metadata
    pub fn new(loc: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            lastmod: None,
            changefreq: None,
            priority: None,
        }
    }

    /// Sets the last modification time
    pub fn with_lastmod(mut self, lastmod: DateTime<Utc>) -> Self {
        self.lastmod = Some(lastmod);
        self
    }
}

/// Descriptors gathered from a sitemap or from every sitemap under an index
#[derive(Debug, Default)]
pub struct ResolvedSitemap {
    /// Flattened descriptors, in document order
    pub descriptors: Vec<PageDescriptor>,
    /// Number of sitemap documents that were read successfully
    pub documents: usize,
    /// Child sitemaps that could not be fetched or parsed
    pub failures: Vec<ParseError>,
}

/// Parses sitemap content that is already in memory
///
/// Gzip payloads are recognised by their magic bytes; `is_gzipped` forces
/// decompression even without them.
pub fn parse_content(content: impl AsRef<[u8]>, is_gzipped: bool) -> ParseResult<Vec<PageDescriptor>> {
    let text = decode_document(content.as_ref(), is_gzipped, ParseError::INLINE)?;
    xml::parse_sitemap_xml(&text, ParseError::INLINE)
}

/// Parses sitemap-index content that is already in memory
pub fn parse_index_content(content: impl AsRef<[u8]>, is_gzipped: bool) -> ParseResult<Vec<String>> {
    let text = decode_document(content.as_ref(), is_gzipped, ParseError::INLINE)?;
    xml::parse_index_xml(&text, ParseError::INLINE)
}

/// A parsed document: either pages or further sitemaps
enum Document {
    Pages(Vec<PageDescriptor>),
    Index(Vec<String>),
}

/// Fetches and parses sitemap documents
#[derive(Debug, Clone)]
pub struct SitemapParser {
    client: Client,
    timeout: Duration,
}

impl SitemapParser {
    /// Builds a parser with its own HTTP client
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client, timeout })
    }

    /// Builds a parser on top of an existing client
    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Fetches and parses a sitemap
    ///
    /// A sitemap index is rejected with [`ParseCause::SitemapIndex`].
    pub async fn parse(&self, url: &str) -> ParseResult<Vec<PageDescriptor>> {
        let text = self.fetch_document(url).await?;
        xml::parse_sitemap_xml(&text, url)
    }

    /// Fetches a sitemap index and returns its child sitemap URLs
    pub async fn parse_index(&self, url: &str) -> ParseResult<Vec<String>> {
        let text = self.fetch_document(url).await?;
        xml::parse_index_xml(&text, url)
    }

    /// Fetches a sitemap or sitemap index and flattens it into descriptors
    ///
    /// Every document is fetched once. A failure of the root document is
    /// returned as an error; a failing child sitemap is logged, recorded in
    /// [`ResolvedSitemap::failures`] and skipped.
    pub async fn resolve(&self, url: &str) -> ParseResult<ResolvedSitemap> {
        let mut resolved = ResolvedSitemap::default();
        let mut pending = VecDeque::from([(url.to_string(), 0u8)]);

        while let Some((current, depth)) = pending.pop_front() {
            let document = match self.fetch_document(&current).await {
                Ok(text) => classify_document(&text, &current, depth),
                Err(e) => Err(e),
            };

            match document {
                Ok(Document::Pages(descriptors)) => {
                    tracing::debug!("Sitemap {} lists {} pages", current, descriptors.len());
                    resolved.documents += 1;
                    resolved.descriptors.extend(descriptors);
                }
                Ok(Document::Index(children)) => {
                    tracing::info!(
                        "Sitemap index {} references {} child sitemaps",
                        current,
                        children.len()
                    );
                    resolved.documents += 1;
                    pending.extend(children.into_iter().map(|child| (child, depth + 1)));
                }
                Err(e) if depth == 0 => return Err(e),
                Err(e) => {
                    tracing::warn!("Skipping child sitemap: {}", e);
                    resolved.failures.push(e);
                }
            }
        }

        Ok(resolved)
    }

    /// Downloads a document and decodes it into XML text
    async fn fetch_document(&self, url: &str) -> ParseResult<String> {
        tracing::debug!("Fetching sitemap document {}", url);

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ParseError::new(url, ParseCause::Http(status.as_u16())));
        }

        let bytes = response.bytes().await.map_err(|e| request_error(url, e))?;
        decode_document(&bytes, false, url)
    }
}

/// Parses a document as a sitemap, falling back to an index
fn classify_document(text: &str, origin: &str, depth: u8) -> ParseResult<Document> {
    match xml::parse_sitemap_xml(text, origin) {
        Ok(descriptors) => Ok(Document::Pages(descriptors)),
        Err(e) if e.is_sitemap_index() => {
            if depth >= MAX_INDEX_DEPTH {
                return Err(ParseError::new(
                    origin,
                    ParseCause::IndexDepthExceeded(MAX_INDEX_DEPTH),
                ));
            }
            xml::parse_index_xml(text, origin).map(Document::Index)
        }
        Err(e) => Err(e),
    }
}

/// Maps a transport error onto a parse error cause
fn request_error(url: &str, error: reqwest::Error) -> ParseError {
    let cause = if error.is_timeout() {
        ParseCause::Timeout
    } else if error.is_connect() {
        ParseCause::Connection(error.to_string())
    } else {
        ParseCause::Request(error.to_string())
    };
    ParseError::new(url, cause)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>https://example.com/docs/intro</loc>
    <lastmod>2024-01-15T10:30:00+00:00</lastmod>
    <changefreq>weekly</changefreq>
    <priority>0.8</priority>
  </url>
  <url>
    <loc>https://example.com/docs/setup</loc>
  </url>
  <url>
    <loc>https://example.com/blog/hello</loc>
    <lastmod>not a date</lastmod>
    <priority>7</priority>
  </url>
</urlset>"#;

    const INDEX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap>
    <loc>https://example.com/sitemap-docs.xml</loc>
    <lastmod>2024-01-15</lastmod>
  </sitemap>
  <sitemap>
    <loc>https://example.com/sitemap-blog.xml.gz</loc>
  </sitemap>
</sitemapindex>"#;

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_parse_content_counts_entries() {
        let entries = parse_content(SITEMAP, false).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| !e.loc.is_empty()));
    }

    #[test]
    fn test_parse_content_metadata() {
        let entries = parse_content(SITEMAP, false).unwrap();

        let first = &entries[0];
        assert_eq!(
            first.lastmod,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap())
        );
        assert_eq!(first.changefreq, Some(ChangeFrequency::Weekly));
        assert_eq!(first.priority, Some(0.8));

        let second = &entries[1];
        assert_eq!(second.lastmod, None);
        assert_eq!(second.changefreq, None);
        assert_eq!(second.priority, None);
    }

    #[test]
    fn test_bad_metadata_does_not_lose_loc() {
        let entries = parse_content(SITEMAP, false).unwrap();
        let third = &entries[2];
        assert_eq!(third.loc, "https://example.com/blog/hello");
        assert_eq!(third.lastmod, None);
        assert_eq!(third.priority, None);
    }

    #[test]
    fn test_unnamespaced_sitemap() {
        let xml = r#"<urlset>
  <url><loc>https://example.com/a</loc><lastmod>2024-02-01</lastmod></url>
  <url><loc>https://example.com/b</loc></url>
</urlset>"#;

        let entries = parse_content(xml, false).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].lastmod.is_some());
    }

    #[test]
    fn test_gzip_round_trip() {
        let plain = parse_content(SITEMAP, false).unwrap();
        let compressed = parse_content(gzip(SITEMAP), true).unwrap();
        assert_eq!(plain, compressed);

        let sniffed = parse_content(gzip(SITEMAP), false).unwrap();
        assert_eq!(plain, sniffed);
    }

    #[test]
    fn test_parse_rejects_index() {
        let err = parse_content(INDEX, false).unwrap_err();
        assert!(err.is_sitemap_index());
        assert_eq!(err.origin, ParseError::INLINE);
        assert!(err.to_string().contains("sitemap index"));
    }

    #[test]
    fn test_parse_index_content() {
        let children = parse_index_content(INDEX, false).unwrap();
        assert_eq!(
            children,
            vec![
                "https://example.com/sitemap-docs.xml",
                "https://example.com/sitemap-blog.xml.gz"
            ]
        );

        let compressed = parse_index_content(gzip(INDEX), true).unwrap();
        assert_eq!(children, compressed);
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let err = parse_content("<urlset><url><loc>https://example.com/", false).unwrap_err();
        assert!(matches!(err.cause, ParseCause::MalformedXml(_)));

        let err = parse_index_content("<sitemapindex><sitemap>", false).unwrap_err();
        assert!(matches!(err.cause, ParseCause::MalformedXml(_)));
    }

    #[test]
    fn test_invalid_gzip_is_an_error() {
        let err = parse_content(b"\x1f\x8bnot really gzip".to_vec(), false).unwrap_err();
        assert!(matches!(err.cause, ParseCause::InvalidGzip(_)));
    }

    #[test]
    fn test_classify_respects_depth_limit() {
        assert!(matches!(
            classify_document(INDEX, "t", 0),
            Ok(Document::Index(_))
        ));

        let err = classify_document(INDEX, "t", MAX_INDEX_DEPTH).err().unwrap();
        assert!(matches!(err.cause, ParseCause::IndexDepthExceeded(_)));
    }
}
