//! Crawler module for catalog traversal and tree assembly
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `Fetcher` trait
//! - HTML parsing into page records
//! - Frontier scheduling and the run loop
//! - Walking index and listing pages into topics
//! - Two-phase resolution of book pages into documents
//! - The post-crawl consistency check

mod checker;
mod control;
mod coordinator;
mod fetcher;
mod parser;
mod resolver;
mod scheduler;
mod walker;

pub use checker::{check, AnomalyError, CheckReport, OccurrenceWarning};
pub use control::{CancelToken, CompletionToken};
pub use coordinator::{run_crawl, Coordinator, CrawlCounters, CrawlOutcome, RunStatus};
pub use fetcher::{build_http_client, FetchError, Fetcher, HttpFetcher};
pub use parser::{
    DownloadOffer, ExtractedLink, HtmlPageParser, MetadataFields, PageKind, PageParser,
    PageRecord, ParseError,
};
pub use resolver::{admit, choose_format, Admission, Resolution};
pub use scheduler::{Continuation, FrontierItem, Scheduler, WalkMode};
pub use walker::{walk_index, walk_listing, WalkOutcome};

use crate::config::Config;
use crate::WeaverError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Seed the frontier with the configured category and collection roots
/// 2. Build the HTTP client
/// 3. Fetch and parse pages until the frontier drains
/// 4. Fold index pages into topics and book pages into documents
/// 5. Check the assembled tree for anomalies
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlOutcome)` - The assembled tree and the run status
/// * `Err(WeaverError)` - The crawl could not start, or a tree invariant broke
pub async fn crawl(config: Config) -> Result<CrawlOutcome, WeaverError> {
    run_crawl(config).await
}
