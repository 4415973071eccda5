//! Tidemark main entry point
//!
//! This is the command-line interface for the Tidemark sitemap importer.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tidemark::config::{load_config_with_hash, Config};
use tidemark::output::{generate_markdown_summary, print_statistics, write_json_report};
use tidemark::Importer;
use tracing_subscriber::EnvFilter;

/// Tidemark: an incremental sitemap importer
///
/// Tidemark reads a sitemap (or sitemap index), filters its URLs through
/// include/exclude rules and fetches only the pages that are new or changed
/// since the previous run, converting them to markdown.
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(version)]
#[command(about = "An incremental sitemap importer", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Fetch every page regardless of stored crawl state
    #[arg(long)]
    force_refresh: bool,

    /// Clear the crawl state store before running
    #[arg(long)]
    reset_state: bool,

    /// List the URLs that pass the rules without fetching any page
    #[arg(long, conflicts_with_all = ["force_refresh", "reset_state", "report", "summary"])]
    dry_run: bool,

    /// Write the import result as JSON to this path
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Write a markdown summary of the run to this path
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(config).await
    } else {
        handle_import(config, &cli).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tidemark=info,warn"),
            1 => EnvFilter::new("tidemark=debug,info"),
            2 => EnvFilter::new("tidemark=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: resolves the sitemap and lists matching URLs
async fn handle_dry_run(config: Config) -> anyhow::Result<()> {
    println!("=== Tidemark Dry Run ===\n");
    println!("Sitemap: {}", config.source.sitemap_url);
    println!(
        "Rules: {} include, {} exclude ({})",
        config.rules.include_patterns.len(),
        config.rules.exclude_patterns.len(),
        if config.rules.use_regex { "regex" } else { "glob" }
    );
    println!();

    let importer = Importer::new(config)?;
    let urls = importer.filtered_urls().await?;

    println!("Matching URLs ({}):", urls.len());
    for url in &urls {
        println!("  - {}", url);
    }

    Ok(())
}

/// Handles the main import run
async fn handle_import(config: Config, cli: &Cli) -> anyhow::Result<()> {
    let force_refresh = cli.force_refresh || config.crawler.force_refresh;
    let importer = Importer::new(config)?.with_force_refresh(force_refresh);

    if cli.reset_state {
        importer.reset_state().context("failed to reset crawl state")?;
    }

    let result = importer.run().await?;

    if let Some(path) = &cli.report {
        write_json_report(&result, path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }
    if let Some(path) = &cli.summary {
        generate_markdown_summary(&result, path)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
    }

    if !cli.quiet {
        print_statistics(&result);
    }

    Ok(())
}
