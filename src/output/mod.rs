//! Output module for the crawl handoff files and reports
//!
//! This module handles:
//! - Exporting the assembled tree as JSON for the publishing stage
//! - Writing the download manifest for the file retrieval stage
//! - Generating markdown summaries and statistics of crawl results

pub mod export;
mod markdown;
pub mod stats;

pub use export::{build_downloads, build_export, write_json, DownloadEntry, ExportNode, ExportTree};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{print_statistics, CrawlStatistics};

use crate::config::Config;
use crate::crawler::{CrawlOutcome, OccurrenceWarning, RunStatus};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Summary of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub channel_title: String,
    pub started_at: String,
    pub finished_at: String,
    pub duration_seconds: i64,
    pub status: RunStatus,
    pub config_hash: String,
    pub statistics: CrawlStatistics,
    pub warnings: Vec<OccurrenceWarning>,
    /// The fatal anomaly that aborted the run, if any
    pub anomaly: Option<String>,
    pub cancelled: bool,
}

/// Generates a crawl summary from a finished run
///
/// # Arguments
///
/// * `outcome` - The finished crawl
/// * `config` - The configuration the crawl ran with
/// * `config_hash` - Hash of the configuration file
pub fn generate_summary(outcome: &CrawlOutcome, config: &Config, config_hash: &str) -> CrawlSummary {
    CrawlSummary {
        channel_title: config.channel.title.clone(),
        started_at: outcome.started_at.to_rfc3339(),
        finished_at: outcome.finished_at.to_rfc3339(),
        duration_seconds: (outcome.finished_at - outcome.started_at).num_seconds(),
        status: outcome.status,
        config_hash: config_hash.to_string(),
        statistics: CrawlStatistics::collect(&outcome.context, &outcome.counters),
        warnings: outcome
            .report
            .as_ref()
            .map(|report| report.warnings.clone())
            .unwrap_or_default(),
        anomaly: outcome.anomaly.as_ref().map(|a| a.to_string()),
        cancelled: outcome.cancelled,
    }
}

/// Writes the tree export, the download manifest, and the markdown summary
///
/// All three files are written whatever the run status; the export records
/// the status so the publishing stage can refuse an aborted tree.
pub fn write_outputs(
    outcome: &CrawlOutcome,
    config: &Config,
    config_hash: &str,
) -> OutputResult<CrawlSummary> {
    let tree = build_export(&outcome.context, &config.channel, outcome.status);
    write_json(&tree, Path::new(&config.output.tree_path))?;
    tracing::info!("Tree written to {}", config.output.tree_path);

    let downloads = build_downloads(&outcome.context);
    write_json(&downloads, Path::new(&config.output.downloads_path))?;
    tracing::info!(
        "{} downloads written to {}",
        downloads.len(),
        config.output.downloads_path
    );

    let summary = generate_summary(outcome, config, config_hash);
    generate_markdown_summary(&summary, Path::new(&config.output.summary_path))?;
    tracing::info!("Summary written to {}", config.output.summary_path);

    Ok(summary)
}
