//! URL rule engine
//!
//! Decides, per URL, whether a sitemap entry should be crawled. The decision
//! is evaluated in the following priority order:
//! 1. Exclude patterns (any match rejects the URL)
//! 2. Include patterns (the URL must match at least one)
//! 3. Default (include everything when no include patterns are configured)

mod matcher;

pub use matcher::PatternMatcher;

use crate::config::RulesConfig;
use crate::{ConfigError, PatternKind};

/// Include and exclude patterns as configured
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlRules {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub use_regex: bool,
}

impl CrawlRules {
    /// The kind every pattern in this rule set is compiled as
    pub fn pattern_kind(&self) -> PatternKind {
        if self.use_regex {
            PatternKind::Regex
        } else {
            PatternKind::Glob
        }
    }
}

impl From<&RulesConfig> for CrawlRules {
    fn from(config: &RulesConfig) -> Self {
        Self {
            include_patterns: config.include_patterns.clone(),
            exclude_patterns: config.exclude_patterns.clone(),
            use_regex: config.use_regex,
        }
    }
}

/// Compiled rule set
///
/// All patterns are compiled when the engine is built, so an invalid pattern
/// is reported before any URL is evaluated.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    include: Vec<PatternMatcher>,
    exclude: Vec<PatternMatcher>,
}

impl RuleEngine {
    /// Compiles a rule set
    ///
    /// # Arguments
    ///
    /// * `rules` - The include/exclude patterns and their kind
    ///
    /// # Returns
    ///
    /// * `Ok(RuleEngine)` - Every pattern compiled
    /// * `Err(ConfigError::InvalidPattern)` - The first pattern that did not
    pub fn new(rules: &CrawlRules) -> Result<Self, ConfigError> {
        let kind = rules.pattern_kind();
        let compile = |patterns: &[String]| {
            patterns
                .iter()
                .map(|p| PatternMatcher::compile(p, kind))
                .collect::<Result<Vec<_>, _>>()
        };

        let engine = Self {
            include: compile(&rules.include_patterns)?,
            exclude: compile(&rules.exclude_patterns)?,
        };

        tracing::debug!(
            "Compiled {} include and {} exclude {} patterns",
            engine.include.len(),
            engine.exclude.len(),
            kind
        );

        Ok(engine)
    }

    /// Returns true if the URL passes the rules
    pub fn should_crawl(&self, url: &str) -> bool {
        if self.exclude.iter().any(|m| m.matches(url)) {
            return false;
        }

        self.include.is_empty() || self.include.iter().any(|m| m.matches(url))
    }

    /// Returns the subset of URLs that pass the rules, in input order
    pub fn filter<'a, I>(&self, urls: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        urls.into_iter().filter(|url| self.should_crawl(url)).collect()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}
