//! Run reports
//!
//! This module writes a finished import to disk, either as a JSON document
//! for downstream consumers or as a human-readable markdown summary.

use crate::importer::ImportResult;
use crate::state::CrawlOutcome;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Writes the import result as pretty-printed JSON
///
/// # Arguments
///
/// * `result` - The finished import
/// * `output_path` - Path where the JSON file should be written
pub fn write_json_report(result: &ImportResult, output_path: &Path) -> OutputResult<()> {
    let json = serde_json::to_string_pretty(result)?;
    create_parent(output_path)?;

    let mut file = File::create(output_path)?;
    file.write_all(json.as_bytes())?;
    file.write_all(b"\n")?;

    tracing::info!("Wrote JSON report to {}", output_path.display());
    Ok(())
}

/// Generates a markdown summary of an import
///
/// # Arguments
///
/// * `result` - The finished import
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(result: &ImportResult, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(result);
    create_parent(output_path)?;

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    tracing::info!("Wrote markdown summary to {}", output_path.display());
    Ok(())
}

/// Formats an import result as markdown
pub fn format_markdown_summary(result: &ImportResult) -> String {
    let stats = &result.stats;
    let mut md = String::new();

    md.push_str("# Tidemark Import Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Sitemap**: {}\n", result.source));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n",
        result.duration.as_secs_f64()
    ));
    md.push_str(&format!("- **Sitemap URLs**: {}\n", result.total_urls));
    md.push_str(&format!("- **Matching Rules**: {}\n", result.filtered_urls));
    if result.budget_exhausted {
        md.push_str(&format!(
            "- **Not Started (run budget)**: {}\n",
            result.unscheduled
        ));
    }
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        result.success_rate()
    ));

    md.push_str("## Outcomes\n\n");
    md.push_str("| Outcome | Pages |\n");
    md.push_str("|---------|-------|\n");
    for outcome in CrawlOutcome::all() {
        md.push_str(&format!("| {} | {} |\n", outcome, stats.count(outcome)));
    }
    md.push_str(&format!("| **total** | {} |\n\n", stats.total_pages()));

    if !result.pages.is_empty() {
        md.push_str("## Changed Pages\n\n");
        md.push_str("| Status | Title | URL |\n");
        md.push_str("|--------|-------|-----|\n");

        let mut pages: Vec<_> = result.pages.iter().collect();
        pages.sort_by(|a, b| a.url.cmp(&b.url));
        for page in pages {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                page.status,
                page.title.replace('|', "\\|"),
                page.url
            ));
        }
        md.push('\n');
    }

    if !result.errors.is_empty() {
        md.push_str("## Errors\n\n");
        md.push_str("| Kind | URL | Message |\n");
        md.push_str("|------|-----|---------|\n");

        for error in result.errors.iter().take(50) {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                error.kind,
                error.url,
                error.message.replace('|', "\\|")
            ));
        }
        if result.errors.len() > 50 {
            md.push_str(&format!("\n... and {} more\n", result.errors.len() - 50));
        }
        md.push('\n');
    }

    md
}

fn create_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
