//! Statistics over a finished crawl
//!
//! This module provides functionality for extracting and displaying
//! statistics from the assembled tree and the run counters.

use crate::crawler::CrawlCounters;
use crate::state::DocumentState;
use crate::tree::{CrawlContext, PathOrigin};
use std::collections::BTreeMap;

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Total number of topics, roots included
    pub total_topics: usize,

    /// Total number of distinct documents reached
    pub total_documents: usize,

    /// Count of documents by state
    pub documents_by_state: BTreeMap<DocumentState, usize>,

    /// Parent-to-document attachments across the tree
    pub total_attachments: u64,

    /// Confirmed documents attached under more than one parent
    pub shared_documents: usize,

    /// Attachments made through each taxonomy
    pub attachments_by_origin: BTreeMap<PathOrigin, u64>,

    /// Confirmed documents per chosen format
    pub documents_by_format: BTreeMap<&'static str, usize>,

    /// Run loop counters
    pub counters: CrawlCounters,
}

impl CrawlStatistics {
    /// Collects statistics from a crawl context and its run counters
    pub fn collect(ctx: &CrawlContext, counters: &CrawlCounters) -> Self {
        let mut stats = Self {
            total_topics: ctx.topic_count(),
            total_documents: ctx.registry().len(),
            documents_by_state: ctx.registry().count_by_state(),
            counters: counters.clone(),
            ..Self::default()
        };

        for (_, document) in ctx.registry().iter() {
            stats.total_attachments += u64::from(document.occurrence_count());
            if document.occurrence_count() > 1 {
                stats.shared_documents += 1;
            }
            for (origin, count) in document.occurrences_by_origin() {
                *stats.attachments_by_origin.entry(*origin).or_insert(0) += u64::from(*count);
            }
            if let Some(format) = document.chosen_format() {
                *stats.documents_by_format.entry(format.as_str()).or_insert(0) += 1;
            }
        }

        stats
    }

    pub fn count(&self, state: DocumentState) -> usize {
        self.documents_by_state.get(&state).copied().unwrap_or(0)
    }

    /// Share of reached documents that were confirmed, as a percentage
    pub fn confirmation_rate(&self) -> f64 {
        if self.total_documents == 0 {
            return 0.0;
        }
        (self.count(DocumentState::Confirmed) as f64 / self.total_documents as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Topics: {}", stats.total_topics);
    println!("  Documents reached: {}", stats.total_documents);
    println!("  Attachments: {}", stats.total_attachments);
    println!("  Shared documents: {}", stats.shared_documents);
    println!();

    println!("Documents by State:");
    for state in DocumentState::all_states() {
        let count = stats.count(state);
        if count == 0 {
            continue;
        }
        let percentage = (count as f64 / stats.total_documents as f64) * 100.0;
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    println!();

    if !stats.attachments_by_origin.is_empty() {
        println!("Attachments by Origin:");
        for (origin, count) in &stats.attachments_by_origin {
            println!("  {}: {}", origin, count);
        }
        println!();
    }

    if !stats.documents_by_format.is_empty() {
        println!("Formats:");
        for (format, count) in &stats.documents_by_format {
            println!("  {}: {}", format, count);
        }
        println!();
    }

    let counters = &stats.counters;
    println!("Run:");
    println!("  Pages fetched: {}", counters.pages_fetched);
    println!("  Fetch failures: {}", counters.fetch_failures);
    println!("  Parse failures: {}", counters.parse_failures);
    println!("  Duplicate pages skipped: {}", counters.items_deduplicated);
    if counters.items_abandoned > 0 {
        println!("  Items abandoned: {}", counters.items_abandoned);
    }
    println!();

    println!(
        "Confirmation Rate: {:.1}% ({} / {} documents confirmed)",
        stats.confirmation_rate(),
        stats.count(DocumentState::Confirmed),
        stats.total_documents
    );
}
