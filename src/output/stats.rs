//! Run statistics
//!
//! This module provides the per-run outcome counters and their terminal
//! rendering.

use crate::importer::ImportResult;
use crate::state::CrawlOutcome;
use serde::{Deserialize, Serialize};

/// Outcome counters for one run
///
/// Exactly one counter is incremented per processed entry, so
/// `total_pages()` always equals the number of processed entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    pub new_pages: u64,
    pub updated_pages: u64,
    pub skipped_pages: u64,
    pub failed_pages: u64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all four counters
    pub fn total_pages(&self) -> u64 {
        self.new_pages + self.updated_pages + self.skipped_pages + self.failed_pages
    }

    /// Counts one entry
    pub fn record(&mut self, outcome: CrawlOutcome) {
        match outcome {
            CrawlOutcome::New => self.new_pages += 1,
            CrawlOutcome::Updated => self.updated_pages += 1,
            CrawlOutcome::Skipped => self.skipped_pages += 1,
            CrawlOutcome::Failed => self.failed_pages += 1,
        }
    }

    /// Adds another set of counters; order of merging does not matter
    pub fn merge(&mut self, other: &CrawlStats) {
        self.new_pages += other.new_pages;
        self.updated_pages += other.updated_pages;
        self.skipped_pages += other.skipped_pages;
        self.failed_pages += other.failed_pages;
    }

    pub fn count(&self, outcome: CrawlOutcome) -> u64 {
        match outcome {
            CrawlOutcome::New => self.new_pages,
            CrawlOutcome::Updated => self.updated_pages,
            CrawlOutcome::Skipped => self.skipped_pages,
            CrawlOutcome::Failed => self.failed_pages,
        }
    }

    /// Percentage of processed entries that did not fail
    pub fn success_rate(&self) -> f64 {
        let total = self.total_pages();
        if total == 0 {
            return 0.0;
        }
        (total - self.failed_pages) as f64 / total as f64 * 100.0
    }
}

/// Counters for a single entry
impl From<CrawlOutcome> for CrawlStats {
    fn from(outcome: CrawlOutcome) -> Self {
        let mut stats = Self::new();
        stats.record(outcome);
        stats
    }
}

/// Prints run statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `result` - The finished import
pub fn print_statistics(result: &ImportResult) {
    let stats = &result.stats;

    println!("=== Import Statistics ===\n");

    println!("Overview:");
    println!("  Sitemap URLs: {}", result.total_urls);
    println!("  Matching rules: {}", result.filtered_urls);
    println!("  Processed: {}", stats.total_pages());
    if result.unscheduled > 0 {
        println!("  Not started (run budget): {}", result.unscheduled);
    }
    println!("  Duration: {:.2}s", result.duration.as_secs_f64());
    println!();

    println!("Pages by Outcome:");
    for outcome in CrawlOutcome::all() {
        let count = stats.count(outcome);
        let percentage = if stats.total_pages() > 0 {
            (count as f64 / stats.total_pages() as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", outcome, count, percentage);
    }
    println!();

    if !result.errors.is_empty() {
        println!("Errors ({}):", result.errors.len());
        for error in result.errors.iter().take(20) {
            println!("  - [{}] {}: {}", error.kind, error.url, error.message);
        }
        if result.errors.len() > 20 {
            println!("  ... and {} more", result.errors.len() - 20);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages without errors)",
        stats.success_rate(),
        stats.total_pages() - stats.failed_pages,
        stats.total_pages()
    );
}
