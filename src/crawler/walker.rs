//! Tree walker: folds index and listing pages into the topic tree.

use crate::crawler::parser::{ExtractedLink, PageRecord};
use crate::crawler::resolver::{self, Admission};
use crate::crawler::scheduler::{Continuation, FrontierItem, WalkMode};
use crate::tree::{CrawlContext, PathOrigin, TopicId, TreeError};
use crate::url::canonical_key;

/// Result of walking one page
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// New frontier items, in page order
    pub items: Vec<FrontierItem>,
    pub topics_created: usize,
    /// Button-style links that were ignored
    pub controls_skipped: usize,
    /// Links leading to a topic or book already known to this run
    pub already_known: usize,
}

/// Walks an index page, offering one topic per link under `parent`
///
/// In branch mode each child is walked again as an index page, one level
/// deeper; in leaf and flat modes each child's page is a book listing.
/// Topics are only placed under a parent once the crawl has drained.
pub fn walk_index(
    ctx: &mut CrawlContext,
    record: &PageRecord,
    parent: TopicId,
    mode: WalkMode,
    depth: u32,
    branch_levels: u32,
) -> Result<WalkOutcome, TreeError> {
    let mut outcome = WalkOutcome::default();

    for link in &record.links {
        if link.is_control {
            outcome.controls_skipped += 1;
            continue;
        }
        let Some(key) = link_key(link) else {
            continue;
        };

        let title = if link.title.is_empty() {
            key.clone()
        } else {
            link.title.clone()
        };

        let Some(topic) = ctx.offer_topic(parent, &title, &key, depth)? else {
            tracing::debug!("Topic {} already known, recorded {} as a candidate parent", key, parent);
            outcome.already_known += 1;
            continue;
        };
        outcome.topics_created += 1;

        let continuation = match mode {
            WalkMode::CategoryBranch => Continuation::Index {
                parent: topic,
                mode: WalkMode::for_category_depth(depth + 1, branch_levels),
                depth: depth + 1,
            },
            WalkMode::CategoryLeaf => Continuation::Listing {
                parent: topic,
                origin: PathOrigin::Category,
            },
            WalkMode::CollectionFlat => Continuation::Listing {
                parent: topic,
                origin: PathOrigin::Collection,
            },
        };

        outcome
            .items
            .push(FrontierItem::new(link.url.clone(), continuation).with_dedupe_key(key));
    }

    tracing::debug!(
        "Index {} ({:?}): {} topics, {} controls skipped",
        record.url,
        mode,
        outcome.topics_created,
        outcome.controls_skipped
    );

    Ok(outcome)
}

/// Walks a listing page, admitting each book under `parent`
///
/// Only books seen for the first time produce a fetch; the others are
/// attached, queued behind the pending fetch, or ignored as discarded.
pub fn walk_listing(
    ctx: &mut CrawlContext,
    record: &PageRecord,
    parent: TopicId,
    origin: PathOrigin,
) -> Result<WalkOutcome, TreeError> {
    let mut outcome = WalkOutcome::default();

    for link in &record.links {
        if link.is_control {
            outcome.controls_skipped += 1;
            continue;
        }
        let Some(key) = link_key(link) else {
            continue;
        };

        match resolver::admit(ctx, &key, parent, origin)? {
            Admission::Fetch(document) => outcome.items.push(FrontierItem::new(
                link.url.clone(),
                Continuation::Book {
                    parent,
                    origin,
                    document,
                },
            )),
            Admission::Attached(_)
            | Admission::AlreadyAttached(_)
            | Admission::Waiting(_)
            | Admission::Rejected(_) => outcome.already_known += 1,
        }
    }

    tracing::debug!(
        "Listing {} ({}): {} new books, {} already known",
        record.url,
        origin,
        outcome.items.len(),
        outcome.already_known
    );

    Ok(outcome)
}

fn link_key(link: &ExtractedLink) -> Option<String> {
    match canonical_key(link.url.as_str()) {
        Ok(key) => Some(key),
        Err(e) => {
            tracing::debug!("Skipping link {}: {}", link.url, e);
            None
        }
    }
}
