//! Catalog-Weaver main entry point
//!
//! This is the command-line interface for the Catalog-Weaver catalog crawler.

use anyhow::Context;
use catalog_weaver::config::{load_config_with_hash, validate, Config};
use catalog_weaver::output::{print_statistics, write_outputs};
use catalog_weaver::{Coordinator, RunStatus};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Catalog-Weaver: a two-taxonomy catalog crawler
///
/// Catalog-Weaver walks a catalog's category tree and its curated
/// collections, verifies every book's download link, and writes a single
/// deduplicated content tree for publishing.
#[derive(Parser, Debug)]
#[command(name = "catalog-weaver")]
#[command(version)]
#[command(about = "A two-taxonomy catalog crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Override the configured number of concurrent requests
    #[arg(long, value_name = "N")]
    max_concurrent: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(max_concurrent) = cli.max_concurrent {
        config.crawler.max_concurrent_requests = max_concurrent;
        validate(&config).context("Invalid --max-concurrent")?;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(ExitCode::SUCCESS);
    }

    handle_crawl(config, &config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_weaver=info,warn"),
            1 => EnvFilter::new("catalog_weaver=debug,info"),
            2 => EnvFilter::new("catalog_weaver=trace,debug"),
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

/// Handles the --dry-run mode: shows the validated configuration and seeds
fn handle_dry_run(config: &Config) {
    println!("=== Catalog-Weaver Dry Run ===\n");

    println!("Channel:");
    println!("  Title: {}", config.channel.title);
    println!("  Source ID: {}", config.channel.source_id);
    println!("  Domain: {}", config.channel.domain);
    println!("  Language: {}", config.channel.language);
    println!("  License: {}", config.channel.license);
    println!("  Provider: {}", config.channel.provider_name());
    if let Some(thumbnail) = &config.channel.thumbnail {
        println!("  Thumbnail: {}", thumbnail);
    }

    println!("\nCatalog:");
    let catalog = &config.catalog;
    match &catalog.category_root {
        Some(root) => println!(
            "  {}: {} ({} branch levels)",
            catalog.categories_title, root, catalog.category_branch_levels
        ),
        None => println!("  {}: not crawled", catalog.categories_title),
    }
    match &catalog.collections_root {
        Some(root) => println!("  {}: {}", catalog.collections_title, root),
        None => println!("  {}: not crawled", catalog.collections_title),
    }

    println!("\nCrawler Configuration:");
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!("  Occurrence warning: > {}", config.crawler.occurrence_warning);
    println!("  Occurrence ceiling: > {}", config.crawler.occurrence_ceiling);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Tree: {}", config.output.tree_path);
    println!("  Downloads: {}", config.output.downloads_path);
    println!("  Summary: {}", config.output.summary_path);

    let seeds = [&catalog.category_root, &catalog.collections_root]
        .iter()
        .filter(|root| root.is_some())
        .count();
    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling from {} root(s)", seeds);
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> anyhow::Result<ExitCode> {
    let coordinator =
        Coordinator::with_http(config.clone()).context("Failed to initialize crawler")?;

    let token = coordinator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            token.cancel();
        }
    });

    let outcome = match coordinator.run().await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    let summary =
        write_outputs(&outcome, &config, config_hash).context("Failed to write crawl output")?;
    print_statistics(&summary.statistics);

    match outcome.status {
        RunStatus::Completed => {
            tracing::info!("Crawl completed successfully");
            Ok(ExitCode::SUCCESS)
        }
        RunStatus::Aborted => {
            if let Some(anomaly) = &outcome.anomaly {
                tracing::error!("Crawl aborted: {}", anomaly);
            } else {
                tracing::error!("Crawl aborted");
            }
            Ok(ExitCode::from(2))
        }
    }
}
