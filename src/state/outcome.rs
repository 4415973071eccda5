/// Classification of one sitemap entry within a run
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to a URL during a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlOutcome {
    /// First successful fetch of the URL
    New,

    /// Content differs from the stored hash, or the fetch was forced
    Updated,

    /// Known unchanged, by `lastmod` or by content hash
    Skipped,

    /// Fetch or persistence failed; stored state untouched
    Failed,
}

impl CrawlOutcome {
    /// Returns true if the outcome produced page content for downstream use
    pub fn has_content(&self) -> bool {
        matches!(self, Self::New | Self::Updated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Updated => "updated",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }

    pub fn all() -> [Self; 4] {
        [Self::New, Self::Updated, Self::Skipped, Self::Failed]
    }
}

impl fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
