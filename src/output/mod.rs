//! Output module for run statistics and reports
//!
//! This module handles:
//! - Counting per-entry outcomes (`CrawlStats`)
//! - Printing run statistics to the terminal
//! - Writing JSON reports and markdown summaries

mod report;
pub mod stats;

pub use report::{
    format_markdown_summary, generate_markdown_summary, write_json_report, OutputError,
    OutputResult,
};
pub use stats::{print_statistics, CrawlStats};
