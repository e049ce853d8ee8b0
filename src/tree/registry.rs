//! Document registry: the deduplication authority.
//!
//! Maps canonical keys to the single `DocumentNode` instance for that key.
//! Entries are never removed; a discarded entry stays as a negative cache
//! entry so later lookups do not re-fetch the book.

use crate::state::DocumentState;
use crate::tree::node::{DocumentId, DocumentNode, PendingParent};
use crate::tree::TreeError;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct DocumentRegistry {
    documents: Vec<DocumentNode>,
    by_key: HashMap<String, DocumentId>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, canonical_key: &str) -> Option<DocumentId> {
        self.by_key.get(canonical_key).copied()
    }

    pub fn get(&self, id: DocumentId) -> Option<&DocumentNode> {
        self.documents.get(id.0 as usize)
    }

    pub(crate) fn get_mut(&mut self, id: DocumentId) -> Result<&mut DocumentNode, TreeError> {
        self.documents
            .get_mut(id.0 as usize)
            .ok_or(TreeError::UnknownDocument(id))
    }

    /// Reserves a pending entry for `canonical_key`, or returns the existing one
    ///
    /// The boolean is true when a new entry was created.
    pub fn reserve(&mut self, canonical_key: &str) -> (DocumentId, bool) {
        if let Some(id) = self.lookup(canonical_key) {
            return (id, false);
        }

        let id = DocumentId(self.documents.len() as u32);
        self.documents
            .push(DocumentNode::reserved(canonical_key.to_string()));
        self.by_key.insert(canonical_key.to_string(), id);
        (id, true)
    }

    /// Moves a document to `next`, rejecting illegal transitions
    pub fn transition(&mut self, id: DocumentId, next: DocumentState) -> Result<(), TreeError> {
        let document = self.get_mut(id)?;
        if !document.state.can_transition_to(next) {
            return Err(TreeError::InvalidTransition {
                key: document.canonical_key.clone(),
                from: document.state,
                to: next,
            });
        }
        document.state = next;
        Ok(())
    }

    /// Records a parent that reached a pending document
    ///
    /// Returns false if the parent was already waiting or already holds the
    /// document.
    pub fn add_waiter(&mut self, id: DocumentId, waiter: PendingParent) -> Result<bool, TreeError> {
        let document = self.get_mut(id)?;
        if document.parents.contains(&waiter.parent)
            || document.waiting.iter().any(|w| w.parent == waiter.parent)
        {
            return Ok(false);
        }
        document.waiting.push(waiter);
        Ok(true)
    }

    pub(crate) fn take_waiters(&mut self, id: DocumentId) -> Result<Vec<PendingParent>, TreeError> {
        Ok(std::mem::take(&mut self.get_mut(id)?.waiting))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Iterates over all documents in registration order
    pub fn iter(&self) -> impl Iterator<Item = (DocumentId, &DocumentNode)> {
        self.documents
            .iter()
            .enumerate()
            .map(|(i, d)| (DocumentId(i as u32), d))
    }

    /// Counts documents in each state
    pub fn count_by_state(&self) -> BTreeMap<DocumentState, usize> {
        let mut counts = BTreeMap::new();
        for document in &self.documents {
            *counts.entry(document.state).or_insert(0) += 1;
        }
        counts
    }

    /// Documents that never reached a terminal state
    pub fn unsettled(&self) -> Vec<DocumentId> {
        self.iter()
            .filter(|(_, d)| d.state.is_pending())
            .map(|(id, _)| id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::node::{PathOrigin, TopicId};

    const KEY: &str = "https://example.com/libro/94";

    #[test]
    fn test_reserve_is_idempotent_per_key() {
        let mut registry = DocumentRegistry::new();

        let (first, created) = registry.reserve(KEY);
        assert!(created);
        let (second, created) = registry.reserve(KEY);
        assert!(!created);

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(KEY), Some(first));
    }

    #[test]
    fn test_distinct_keys_distinct_documents() {
        let mut registry = DocumentRegistry::new();
        let (a, _) = registry.reserve(KEY);
        let (b, _) = registry.reserve("https://example.com/libro/95");
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_transition_rejects_skipping_download_phase() {
        let mut registry = DocumentRegistry::new();
        let (id, _) = registry.reserve(KEY);

        let err = registry.transition(id, DocumentState::Confirmed).unwrap_err();
        assert!(matches!(
            err,
            TreeError::InvalidTransition {
                from: DocumentState::PendingMetadata,
                to: DocumentState::Confirmed,
                ..
            }
        ));

        registry
            .transition(id, DocumentState::PendingDownloadLink)
            .unwrap();
        registry.transition(id, DocumentState::Confirmed).unwrap();
        assert_eq!(registry.get(id).unwrap().state(), DocumentState::Confirmed);
    }

    #[test]
    fn test_waiters_are_deduplicated() {
        let mut registry = DocumentRegistry::new();
        let (id, _) = registry.reserve(KEY);
        let waiter = PendingParent {
            parent: TopicId(3),
            origin: PathOrigin::Collection,
        };

        assert!(registry.add_waiter(id, waiter).unwrap());
        assert!(!registry.add_waiter(id, waiter).unwrap());

        let taken = registry.take_waiters(id).unwrap();
        assert_eq!(taken, vec![waiter]);
        assert!(registry.get(id).unwrap().waiting().is_empty());
    }

    #[test]
    fn test_count_by_state_and_unsettled() {
        let mut registry = DocumentRegistry::new();
        let (a, _) = registry.reserve(KEY);
        let (b, _) = registry.reserve("https://example.com/libro/95");
        registry.transition(b, DocumentState::Discarded).unwrap();

        let counts = registry.count_by_state();
        assert_eq!(counts.get(&DocumentState::PendingMetadata), Some(&1));
        assert_eq!(counts.get(&DocumentState::Discarded), Some(&1));
        assert_eq!(registry.unsettled(), vec![a]);
    }

    #[test]
    fn test_unknown_document() {
        let mut registry = DocumentRegistry::new();
        assert!(matches!(
            registry.transition(DocumentId(7), DocumentState::Discarded),
            Err(TreeError::UnknownDocument(DocumentId(7)))
        ));
    }
}
