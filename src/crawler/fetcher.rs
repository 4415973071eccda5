//! Page fetching
//!
//! This module defines the fetch collaborator used by the incremental crawler:
//! - The `PageFetcher` trait the crawler depends on
//! - `HttpPageFetcher`, which downloads raw HTML (optionally behind robots.txt)
//! - `ConvertingFetcher`, which turns any fetcher's HTML into markdown
//! - Building HTTP clients with the configured user agent

use crate::config::UserAgentConfig;
use crate::convert::HtmlConverter;
use crate::robots::RobotsGate;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Why a single page could not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("HTTP error status {0}")]
    Http(u16),

    #[error("request failed: {0}")]
    Request(String),

    #[error("disallowed by robots.txt")]
    RobotsDisallowed,
}

impl FetchError {
    /// Classifies a reqwest error
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connection(error.to_string())
        } else if let Some(status) = error.status() {
            Self::Http(status.as_u16())
        } else {
            Self::Request(error.to_string())
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// Content returned by a fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    /// The text the content hash is computed over
    pub content: String,
    /// Page title, when the fetcher knows one
    pub title: Option<String>,
}

impl FetchedDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            title: None,
        }
    }
}

/// Retrieves page content for the crawler
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Connect timeout; request timeouts are set per request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Downloads raw HTML over HTTP
#[derive(Debug)]
pub struct HttpPageFetcher {
    client: Client,
    timeout: Duration,
    robots: Option<RobotsGate>,
}

impl HttpPageFetcher {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            robots: None,
        }
    }

    /// Checks every URL against robots.txt before fetching it
    pub fn with_robots(mut self, gate: RobotsGate) -> Self {
        self.robots = Some(gate);
        self
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError> {
        if let Some(robots) = &self.robots {
            if !robots.is_allowed(url).await {
                tracing::warn!("robots.txt disallows {}", url);
                return Err(FetchError::RobotsDisallowed);
            }
        }

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;
        Ok(FetchedDocument::new(body))
    }
}

/// Wraps a fetcher and converts the HTML it returns into markdown
///
/// The crawler then hashes the converted text, so markup-only changes such as
/// rotating script nonces do not register as content updates.
#[derive(Debug)]
pub struct ConvertingFetcher<F> {
    inner: F,
    converter: HtmlConverter,
}

impl<F: PageFetcher> ConvertingFetcher<F> {
    pub fn new(inner: F, converter: HtmlConverter) -> Self {
        Self { inner, converter }
    }
}

#[async_trait]
impl<F: PageFetcher> PageFetcher for ConvertingFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError> {
        let html = self.inner.fetch(url).await?;
        let page = self.converter.convert_page(&html.content, url);
        Ok(FetchedDocument {
            content: page.content,
            title: Some(page.title),
        })
    }
}
