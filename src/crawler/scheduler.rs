//! Scheduler for managing the crawl frontier
//!
//! This module handles:
//! - The FIFO queue of pages still to fetch
//! - Per-run deduplication of frontier items by dedupe key
//! - The in-flight cap that bounds concurrent fetches
//!
//! Every item carries its continuation: the handler that will receive the
//! parsed page together with the tree context it was discovered in.

use crate::crawler::parser::PageKind;
use crate::tree::{ArtifactFormat, DocumentId, PathOrigin, TopicId};
use std::collections::{HashSet, VecDeque};
use url::Url;

/// How an index page's links become topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkMode {
    /// Each link is a category that has further index pages below it
    CategoryBranch,
    /// Each link is a category whose page lists books
    CategoryLeaf,
    /// Each link is a collection placed directly under the collections root
    CollectionFlat,
}

impl WalkMode {
    /// Mode of the first index page under the category root
    pub fn for_category_root(branch_levels: u32) -> Self {
        Self::for_category_depth(0, branch_levels)
    }

    /// Mode of a category index page at `depth` below the root
    pub fn for_category_depth(depth: u32, branch_levels: u32) -> Self {
        if depth < branch_levels {
            Self::CategoryBranch
        } else {
            Self::CategoryLeaf
        }
    }
}

/// What to do with a page once it has been fetched and parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Walk an index page, creating topics under `parent`
    Index {
        parent: TopicId,
        mode: WalkMode,
        depth: u32,
    },
    /// Walk a listing page, admitting its books under `parent`
    Listing { parent: TopicId, origin: PathOrigin },
    /// Resolve a book page for an already reserved document
    Book {
        parent: TopicId,
        origin: PathOrigin,
        document: DocumentId,
    },
    /// Read the artifact locator from a format's confirmation page
    Download {
        document: DocumentId,
        parent: TopicId,
        origin: PathOrigin,
        format: ArtifactFormat,
    },
}

impl Continuation {
    /// The kind of page the continuation expects
    pub fn page_kind(&self) -> PageKind {
        match self {
            Self::Index {
                mode: WalkMode::CollectionFlat,
                ..
            } => PageKind::CollectionIndex,
            Self::Index { .. } => PageKind::CategoryIndex,
            Self::Listing { .. } => PageKind::Listing,
            Self::Book { .. } => PageKind::Book,
            Self::Download { .. } => PageKind::DownloadConfirmation,
        }
    }

    /// The document this item is resolving, if any
    pub fn document(&self) -> Option<DocumentId> {
        match self {
            Self::Book { document, .. } | Self::Download { document, .. } => Some(*document),
            Self::Index { .. } | Self::Listing { .. } => None,
        }
    }
}

/// A page queued for fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierItem {
    pub url: Url,
    pub continuation: Continuation,
    /// Items sharing a dedupe key are fetched at most once per run
    pub dedupe_key: Option<String>,
}

impl FrontierItem {
    pub fn new(url: Url, continuation: Continuation) -> Self {
        Self {
            url,
            continuation,
            dedupe_key: None,
        }
    }

    pub fn with_dedupe_key(mut self, key: impl Into<String>) -> Self {
        self.dedupe_key = Some(key.into());
        self
    }
}

/// Scheduler manages the frontier queue and the in-flight cap
///
/// Items are handed out in FIFO order; `next_item` yields nothing while the
/// number of in-flight fetches is at the configured limit.
#[derive(Debug)]
pub struct Scheduler {
    /// Frontier queue of pages to fetch
    frontier: VecDeque<FrontierItem>,

    /// Dedupe keys seen during this run
    seen: HashSet<String>,

    /// Maximum number of concurrent fetches
    max_in_flight: usize,

    enqueued: usize,
    deduplicated: usize,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `max_in_flight` - Maximum number of concurrent fetches (at least 1)
    /// * `initial_frontier` - Seed items
    pub fn new(max_in_flight: usize, initial_frontier: Vec<FrontierItem>) -> Self {
        let mut scheduler = Self {
            frontier: VecDeque::new(),
            seen: HashSet::new(),
            max_in_flight: max_in_flight.max(1),
            enqueued: 0,
            deduplicated: 0,
        };
        for item in initial_frontier {
            scheduler.add_to_frontier(item);
        }
        scheduler
    }

    /// Adds an item to the back of the frontier
    ///
    /// Returns false when the item's dedupe key was already seen in this run;
    /// the item is dropped in that case.
    pub fn add_to_frontier(&mut self, item: FrontierItem) -> bool {
        if let Some(key) = &item.dedupe_key {
            if !self.seen.insert(key.clone()) {
                tracing::debug!("Skipping already scheduled page: {}", item.url);
                self.deduplicated += 1;
                return false;
            }
        }

        self.frontier.push_back(item);
        self.enqueued += 1;
        true
    }

    /// Gets the next item to fetch
    ///
    /// # Returns
    ///
    /// * `Some(FrontierItem)` - The oldest queued item
    /// * `None` - The frontier is empty or `in_flight` is at the limit
    pub fn next_item(&mut self, in_flight: usize) -> Option<FrontierItem> {
        if in_flight >= self.max_in_flight {
            return None;
        }
        self.frontier.pop_front()
    }

    /// Removes every queued item, returning how many there were
    pub fn clear(&mut self) -> usize {
        let remaining = self.frontier.len();
        self.frontier.clear();
        remaining
    }

    /// Returns the number of items in the frontier
    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    /// Returns whether the frontier is empty
    pub fn is_empty(&self) -> bool {
        self.frontier.is_empty()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Total items accepted into the frontier
    pub fn enqueued(&self) -> usize {
        self.enqueued
    }

    /// Total items dropped because their dedupe key was already seen
    pub fn deduplicated(&self) -> usize {
        self.deduplicated
    }
}
