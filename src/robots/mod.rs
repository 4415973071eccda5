//! Robots.txt handling module
//!
//! This module provides an optional gate for page fetches: robots.txt is
//! fetched once per origin per run, cached, and every page URL is checked
//! against it before the page itself is requested.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::ParsedRobots;

use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Checks page URLs against the robots.txt of their origin
#[derive(Debug)]
pub struct RobotsGate {
    client: Client,
    /// Product token matched against `User-agent` lines
    agent: String,
    timeout: Duration,
    cache: RobotsCache,
}

impl RobotsGate {
    /// Creates a gate
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used to fetch robots.txt
    /// * `agent` - The user agent product token (e.g. "Tidemark")
    /// * `timeout` - Timeout for each robots.txt request
    pub fn new(client: Client, agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            agent: agent.into(),
            timeout,
            cache: RobotsCache::new(),
        }
    }

    /// Checks if a URL may be fetched
    ///
    /// URLs that cannot be parsed are allowed; the fetch itself will fail.
    pub async fn is_allowed(&self, url: &str) -> bool {
        let Some(origin) = origin_of(url) else {
            return true;
        };

        let robots = self
            .cache
            .get_or_fetch(&origin, || self.fetch_robots(&origin))
            .await;
        robots.is_allowed(url, &self.agent)
    }

    /// Number of origins whose robots.txt has been loaded
    pub fn cached_origins(&self) -> usize {
        self.cache.len()
    }

    /// Fetches robots.txt for an origin
    ///
    /// A missing robots.txt (4xx) allows everything. Server errors and
    /// network failures are logged and also allow everything.
    async fn fetch_robots(&self, origin: &str) -> ParsedRobots {
        let robots_url = format!("{}/robots.txt", origin);
        tracing::debug!("Fetching {}", robots_url);

        let response = match self
            .client
            .get(&robots_url)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Could not fetch {}: {}; allowing all", robots_url, e);
                return ParsedRobots::allow_all();
            }
        };

        let status = response.status();
        if status.is_client_error() {
            return ParsedRobots::allow_all();
        }
        if !status.is_success() {
            tracing::warn!("{} returned {}; allowing all", robots_url, status);
            return ParsedRobots::allow_all();
        }

        match response.text().await {
            Ok(body) => ParsedRobots::from_content(&body),
            Err(e) => {
                tracing::warn!("Could not read {}: {}; allowing all", robots_url, e);
                ParsedRobots::allow_all()
            }
        }
    }
}

/// `scheme://host[:port]` of an http(s) URL
fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    Some(parsed.origin().ascii_serialization())
}
