//! Post-crawl consistency checker
//!
//! Runs once over the assembled tree after the frontier has drained:
//! - occurrence counts above the warning threshold are reported
//! - occurrence counts above the ceiling abort the run
//! - every document's count must equal the number of topics holding it
//! - no unconfirmed document may be held by any topic

use crate::config::CrawlerConfig;
use crate::state::DocumentState;
use crate::tree::{CrawlContext, DocumentId, NodeRef};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Fatal anomalies found in the assembled tree
#[derive(Debug, Error)]
pub enum AnomalyError {
    #[error("Document {key} occurs {count} times, above the ceiling of {ceiling}")]
    OccurrenceCeiling { key: String, count: u32, ceiling: u32 },

    #[error("Document {key} counts {count} occurrences but is held by {holders} topics")]
    OccurrenceMismatch {
        key: String,
        count: u32,
        holders: usize,
    },

    #[error("Document {key} is attached while {state}")]
    UnconfirmedAttached { key: String, state: DocumentState },
}

/// A document reached more often than expected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceWarning {
    pub key: String,
    pub title: String,
    pub count: u32,
}

/// Summary of a successful check
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub documents_checked: usize,
    pub warnings: Vec<OccurrenceWarning>,
    pub by_state: BTreeMap<DocumentState, usize>,
}

/// Checks the assembled tree against the crawler's occurrence thresholds
pub fn check(ctx: &CrawlContext, config: &CrawlerConfig) -> Result<CheckReport, AnomalyError> {
    let mut holders: HashMap<DocumentId, usize> = HashMap::new();
    for (_, topic) in ctx.topics() {
        for child in topic.children() {
            if let NodeRef::Document(id) = child {
                *holders.entry(*id).or_insert(0) += 1;
            }
        }
    }

    let mut report = CheckReport {
        by_state: ctx.registry().count_by_state(),
        ..CheckReport::default()
    };

    for (id, document) in ctx.registry().iter() {
        report.documents_checked += 1;
        let held_by = holders.get(&id).copied().unwrap_or(0);
        let count = document.occurrence_count();

        if held_by > 0 && !document.state().is_attachable() {
            return Err(AnomalyError::UnconfirmedAttached {
                key: document.canonical_key.clone(),
                state: document.state(),
            });
        }

        if count as usize != held_by {
            return Err(AnomalyError::OccurrenceMismatch {
                key: document.canonical_key.clone(),
                count,
                holders: held_by,
            });
        }

        if count > config.occurrence_ceiling {
            tracing::error!(
                "{} occurs {} times (ceiling {})",
                document.canonical_key,
                count,
                config.occurrence_ceiling
            );
            return Err(AnomalyError::OccurrenceCeiling {
                key: document.canonical_key.clone(),
                count,
                ceiling: config.occurrence_ceiling,
            });
        }

        if count > config.occurrence_warning {
            tracing::warn!(
                "{} \"{}\" occurs {} times",
                document.canonical_key,
                document.metadata.title,
                count
            );
            report.warnings.push(OccurrenceWarning {
                key: document.canonical_key.clone(),
                title: document.metadata.title.clone(),
                count,
            });
        }
    }

    tracing::info!(
        "Consistency check passed: {} documents, {} warnings",
        report.documents_checked,
        report.warnings.len()
    );

    Ok(report)
}
