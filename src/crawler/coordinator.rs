//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the run loop that coordinates a crawl:
//! - Seeding the frontier with the category and collection roots
//! - Dispatching concurrent fetches up to the configured limit
//! - Routing parsed pages to the walker or the resolver
//! - Handling cancellation and terminal completion
//! - Placing discovered topics once the frontier has drained
//! - Running the consistency check over the assembled tree
//!
//! All tree and registry mutation happens here, on the loop itself; fetch
//! tasks only ever see a URL.

use crate::config::{validate, Config};
use crate::crawler::checker::{self, AnomalyError, CheckReport};
use crate::crawler::control::{CancelToken, CompletionToken};
use crate::crawler::fetcher::{FetchError, Fetcher, HttpFetcher};
use crate::crawler::parser::{HtmlPageParser, PageParser};
use crate::crawler::resolver::{self, Resolution};
use crate::crawler::scheduler::{Continuation, FrontierItem, Scheduler, WalkMode};
use crate::crawler::walker::{self, WalkOutcome};
use crate::tree::CrawlContext;
use crate::url::{canonical_key, parse_absolute};
use crate::WeaverError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Pages between progress reports
const PROGRESS_INTERVAL: usize = 25;

/// Terminal status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// The frontier drained and the completion token was raised
    Completed,
    /// Cancelled, or stopped by a fatal anomaly
    Aborted,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters kept during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlCounters {
    pub pages_fetched: usize,
    pub fetch_failures: usize,
    pub parse_failures: usize,
    pub items_enqueued: usize,
    pub items_deduplicated: usize,
    /// Items still queued or in flight when the run stopped
    pub items_abandoned: usize,
    pub controls_skipped: usize,
    pub documents_confirmed: usize,
    pub documents_discarded: usize,
}

/// Everything a finished run produced
#[derive(Debug)]
pub struct CrawlOutcome {
    pub status: RunStatus,
    pub context: CrawlContext,
    /// Present when the consistency check passed
    pub report: Option<CheckReport>,
    /// Present when the consistency check found a fatal anomaly
    pub anomaly: Option<AnomalyError>,
    pub cancelled: bool,
    pub counters: CrawlCounters,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

type FetchOutput = (FrontierItem, Result<String, FetchError>);

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    parser: Box<dyn PageParser + Send + Sync>,
    scheduler: Scheduler,
    context: CrawlContext,
    cancel: CancelToken,
    counters: CrawlCounters,
}

impl Coordinator {
    /// Creates a coordinator and seeds its frontier with the catalog roots
    ///
    /// The configuration is validated first. Each configured root becomes a
    /// top-level topic; categories first, then collections.
    pub fn new(
        config: Config,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        parser: Box<dyn PageParser + Send + Sync>,
    ) -> Result<Self, WeaverError> {
        validate(&config)?;

        let mut context = CrawlContext::new();
        let mut seeds = Vec::new();
        let catalog = &config.catalog;

        let roots = [
            (
                catalog.category_root.as_deref(),
                catalog.categories_title.as_str(),
                WalkMode::for_category_root(catalog.category_branch_levels),
            ),
            (
                catalog.collections_root.as_deref(),
                catalog.collections_title.as_str(),
                WalkMode::CollectionFlat,
            ),
        ];

        for (root, title, mode) in roots {
            let Some(root) = root else {
                continue;
            };
            let url = parse_absolute(root)?;
            let key = canonical_key(url.as_str())?;

            let Some(topic) = context.add_topic(None, title, &key)? else {
                tracing::warn!("Root {} configured twice, seeding it once", root);
                continue;
            };

            tracing::info!("Seeding {} from {}", title, url);
            seeds.push(
                FrontierItem::new(
                    url,
                    Continuation::Index {
                        parent: topic,
                        mode,
                        depth: 0,
                    },
                )
                .with_dedupe_key(key),
            );
        }

        let scheduler = Scheduler::new(config.crawler.max_concurrent_requests as usize, seeds);

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            parser,
            scheduler,
            context,
            cancel: CancelToken::new(),
            counters: CrawlCounters::default(),
        })
    }

    /// Creates a coordinator using the HTTP fetcher and HTML parser
    pub fn with_http(config: Config) -> Result<Self, WeaverError> {
        let fetcher = HttpFetcher::new(&config.user_agent)?;
        Self::new(config, Arc::new(fetcher), Box::new(HtmlPageParser::new()))
    }

    /// Replaces the coordinator's cancellation token with a shared one
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops the run when cancelled
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn context(&self) -> &CrawlContext {
        &self.context
    }

    /// Runs the crawl to completion or cancellation
    ///
    /// Fetch and parse failures drop their branch and never end the run.
    /// Errors are only returned for broken tree invariants.
    pub async fn run(mut self) -> Result<CrawlOutcome, WeaverError> {
        let started_at = Utc::now();
        let start_time = std::time::Instant::now();
        tracing::info!(
            "Starting crawl of {} ({} seed pages)",
            self.config.channel.title,
            self.scheduler.frontier_size()
        );

        let mut in_flight: JoinSet<FetchOutput> = JoinSet::new();
        let mut completion = CompletionToken::new();
        let cancel = self.cancel.clone();
        let mut next_report = PROGRESS_INTERVAL;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            while let Some(item) = self.scheduler.next_item(in_flight.len()) {
                tracing::debug!("Fetching {}", item.url);
                let fetcher = Arc::clone(&self.fetcher);
                in_flight.spawn(async move {
                    let result = fetcher.fetch(item.url.as_str()).await;
                    (item, result)
                });
            }

            if in_flight.is_empty() {
                tracing::info!("Frontier is empty, crawl complete");
                completion.raise();
                break;
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    break;
                }

                joined = in_flight.join_next() => {
                    match joined {
                        Some(Ok((item, result))) => self.route(item, result)?,
                        Some(Err(e)) => {
                            tracing::error!("Fetch task failed: {}", e);
                            self.counters.fetch_failures += 1;
                        }
                        None => {}
                    }
                }
            }

            let pages = self.counters.pages_fetched;
            if pages >= next_report {
                next_report = pages + PROGRESS_INTERVAL;
                tracing::info!(
                    "Progress: {} pages fetched, {} in frontier, {} topics, {} documents, {:.2} pages/sec",
                    pages,
                    self.scheduler.frontier_size(),
                    self.context.topic_count(),
                    self.context.registry().len(),
                    pages as f64 / start_time.elapsed().as_secs_f64()
                );
            }
        }

        let cancelled = cancel.is_cancelled() && !completion.is_raised();
        if cancelled {
            let abandoned = in_flight.len() + self.scheduler.clear();
            in_flight.abort_all();
            self.counters.items_abandoned = abandoned;
            tracing::warn!("Crawl cancelled with {} items left", abandoned);
        }

        let placed = self.context.place_topics()?;
        tracing::debug!("Placed {} topics", placed);
        self.settle_pending()?;

        self.counters.items_enqueued = self.scheduler.enqueued();
        self.counters.items_deduplicated = self.scheduler.deduplicated();

        let (report, anomaly) = match checker::check(&self.context, &self.config.crawler) {
            Ok(report) => (Some(report), None),
            Err(anomaly) => {
                tracing::error!("Consistency check failed: {}", anomaly);
                (None, Some(anomaly))
            }
        };

        let status = if completion.is_raised() && self.scheduler.is_empty() && anomaly.is_none() {
            RunStatus::Completed
        } else {
            RunStatus::Aborted
        };

        tracing::info!(
            "Crawl {}: {} pages fetched, {} confirmed, {} discarded in {:?}",
            status,
            self.counters.pages_fetched,
            self.counters.documents_confirmed,
            self.counters.documents_discarded,
            start_time.elapsed()
        );

        Ok(CrawlOutcome {
            status,
            context: self.context,
            report,
            anomaly,
            cancelled,
            counters: self.counters,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Hands a finished fetch to the continuation it was queued with
    fn route(
        &mut self,
        item: FrontierItem,
        result: Result<String, FetchError>,
    ) -> Result<(), WeaverError> {
        let content = match result {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Dropping branch at {}: {}", item.url, e);
                self.counters.fetch_failures += 1;
                return self.abandon(&item);
            }
        };
        self.counters.pages_fetched += 1;

        let kind = item.continuation.page_kind();
        let record = match self.parser.parse(&content, &item.url, kind) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Dropping branch at {}: {}", item.url, e);
                self.counters.parse_failures += 1;
                return self.abandon(&item);
            }
        };

        match item.continuation {
            Continuation::Index {
                parent,
                mode,
                depth,
            } => {
                let outcome = walker::walk_index(
                    &mut self.context,
                    &record,
                    parent,
                    mode,
                    depth,
                    self.config.catalog.category_branch_levels,
                )?;
                self.enqueue(outcome);
            }
            Continuation::Listing { parent, origin } => {
                let outcome = walker::walk_listing(&mut self.context, &record, parent, origin)?;
                self.enqueue(outcome);
            }
            Continuation::Book {
                parent,
                origin,
                document,
            } => {
                let resolution =
                    resolver::resolve_book(&mut self.context, &record, document, parent, origin)?;
                self.record_resolution(resolution);
            }
            Continuation::Download {
                document,
                parent,
                origin,
                format,
            } => {
                let resolution = resolver::confirm_download(
                    &mut self.context,
                    &record,
                    document,
                    parent,
                    origin,
                    format,
                )?;
                self.record_resolution(resolution);
            }
        }

        Ok(())
    }

    fn enqueue(&mut self, outcome: WalkOutcome) {
        self.counters.controls_skipped += outcome.controls_skipped;
        for item in outcome.items {
            self.scheduler.add_to_frontier(item);
        }
    }

    fn record_resolution(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Pending(item) => {
                self.scheduler.add_to_frontier(item);
            }
            Resolution::Confirmed { .. } => self.counters.documents_confirmed += 1,
            Resolution::Discarded { .. } => self.counters.documents_discarded += 1,
        }
    }

    /// Discards the document a dropped branch was resolving, if any
    fn abandon(&mut self, item: &FrontierItem) -> Result<(), WeaverError> {
        if let Some(document) = item.continuation.document() {
            if let Some(resolution) = resolver::abandon(&mut self.context, document)? {
                self.record_resolution(resolution);
            }
        }
        Ok(())
    }

    /// Discards documents that never settled before the loop ended
    fn settle_pending(&mut self) -> Result<(), WeaverError> {
        for document in self.context.registry().unsettled() {
            if let Some(resolution) = resolver::abandon(&mut self.context, document)? {
                self.record_resolution(resolution);
            }
        }
        Ok(())
    }
}

/// Runs a complete crawl over HTTP
///
/// # Example
///
/// ```no_run
/// use catalog_weaver::config::load_config;
/// use catalog_weaver::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let outcome = run_crawl(config).await?;
/// println!("{}", outcome.status);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlOutcome, WeaverError> {
    Coordinator::with_http(config)?.run().await
}
