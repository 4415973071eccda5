use serde::Deserialize;

/// Main configuration structure for Tidemark
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
}

/// Where the page descriptors come from
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// URL of a sitemap or sitemap index (may be gzip-compressed)
    #[serde(rename = "sitemap-url")]
    pub sitemap_url: String,

    /// Timeout for each sitemap document fetch (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Include/exclude rules applied to every descriptor URL
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesConfig {
    #[serde(rename = "include-patterns", default)]
    pub include_patterns: Vec<String>,

    #[serde(rename = "exclude-patterns", default)]
    pub exclude_patterns: Vec<String>,

    /// Treat patterns as regular expressions instead of globs
    #[serde(rename = "use-regex", default)]
    pub use_regex: bool,
}

/// Crawl state backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    /// Process-lifetime map, nothing survives a restart
    #[default]
    Memory,
    /// Flat JSON file mapping URL to state
    Json,
    /// SQLite database file
    Sqlite,
}

/// Crawl state store configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateConfig {
    #[serde(default)]
    pub backend: StateBackend,

    /// Backing file for the json and sqlite backends
    #[serde(default)]
    pub path: Option<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of concurrent page fetches
    #[serde(rename = "max-concurrent-pages", default = "default_max_concurrent_pages")]
    pub max_concurrent_pages: u32,

    /// Timeout for a single page fetch (seconds)
    #[serde(rename = "page-timeout-secs", default = "default_timeout_secs")]
    pub page_timeout_secs: u64,

    /// Optional wall-clock budget for the whole run (seconds)
    #[serde(rename = "run-budget-secs", default)]
    pub run_budget_secs: Option<u64>,

    /// Fetch every page regardless of stored state
    #[serde(rename = "force-refresh", default)]
    pub force_refresh: bool,

    /// Consult robots.txt before fetching pages
    #[serde(rename = "respect-robots", default)]
    pub respect_robots: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_pages: default_max_concurrent_pages(),
            page_timeout_secs: default_timeout_secs(),
            run_budget_secs: None,
            force_refresh: false,
            respect_robots: false,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the importer
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Version of the importer
    #[serde(default = "default_agent_version")]
    pub version: String,

    /// URL with information about the importer
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(url) => format!("{}/{} (+{})", self.name, self.version, url),
            None => format!("{}/{}", self.name, self.version),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            version: default_agent_version(),
            contact_url: None,
        }
    }
}

/// HTML to markdown conversion options
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConverterConfig {
    /// Elements stripped before conversion; `None` keeps the built-in list
    #[serde(rename = "remove-tags", default)]
    pub remove_tags: Option<Vec<String>>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_pages() -> u32 {
    5
}

fn default_agent_name() -> String {
    "Tidemark".to_string()
}

fn default_agent_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
