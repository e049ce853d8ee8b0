//! Per-run crawl context.
//!
//! Owns the topic arena, the document registry, and the download handoff
//! list for exactly one run. All mutation goes through the run loop, so no
//! locking is involved.
//!
//! Topics discovered by the walker are offered with their parent but only
//! placed once the crawl has drained, so a topic linked from several index
//! pages lands under the same parent whatever order the pages arrived in.

use crate::state::DocumentState;
use crate::tree::node::{
    Artifact, DocumentId, DocumentNode, DownloadJob, NodeRef, PathOrigin, PendingParent, TopicId,
    TopicNode,
};
use crate::tree::registry::DocumentRegistry;
use crate::tree::TreeError;
use std::collections::{BTreeMap, HashMap};

/// An index page that links a topic, recorded until placement
#[derive(Debug, Clone)]
struct TopicCandidate {
    parent: TopicId,
    /// Walk depth of the linking index page
    depth: u32,
    title: String,
}

#[derive(Debug, Default)]
pub struct CrawlContext {
    topics: Vec<TopicNode>,
    topic_by_source: HashMap<String, TopicId>,
    roots: Vec<TopicId>,
    unplaced: BTreeMap<TopicId, Vec<TopicCandidate>>,
    registry: DocumentRegistry,
    downloads: Vec<DownloadJob>,
}

impl CrawlContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a topic under `parent`, or a top-level root when `parent` is `None`
    ///
    /// Returns `Ok(None)` when a topic with the same source key already
    /// exists anywhere in the tree; the existing topic is left untouched.
    pub fn add_topic(
        &mut self,
        parent: Option<TopicId>,
        title: &str,
        source_key: &str,
    ) -> Result<Option<TopicId>, TreeError> {
        if self.topic_by_source.contains_key(source_key) {
            return Ok(None);
        }
        if let Some(parent) = parent {
            self.topic(parent).ok_or(TreeError::UnknownTopic(parent))?;
        }

        let id = TopicId(self.topics.len() as u32);
        self.topics
            .push(TopicNode::new(title.to_string(), source_key.to_string()));
        self.topic_by_source.insert(source_key.to_string(), id);

        match parent {
            Some(parent) => self.topic_mut(parent)?.push_child(NodeRef::Topic(id)),
            None => self.roots.push(id),
        }

        Ok(Some(id))
    }

    /// Offers a topic linked from the index page of `parent` at walk `depth`
    ///
    /// The first offer creates the topic and returns its id; the topic is not
    /// yet a child of anything. Later offers of the same source key only add
    /// `parent` as a candidate and return `Ok(None)`. [`place_topics`] picks
    /// the final parent.
    ///
    /// [`place_topics`]: CrawlContext::place_topics
    pub fn offer_topic(
        &mut self,
        parent: TopicId,
        title: &str,
        source_key: &str,
        depth: u32,
    ) -> Result<Option<TopicId>, TreeError> {
        self.topic(parent).ok_or(TreeError::UnknownTopic(parent))?;

        let candidate = TopicCandidate {
            parent,
            depth,
            title: title.to_string(),
        };

        if let Some(&existing) = self.topic_by_source.get(source_key) {
            if existing != parent {
                if let Some(candidates) = self.unplaced.get_mut(&existing) {
                    if candidates.iter().all(|c| c.parent != parent) {
                        candidates.push(candidate);
                    }
                }
            }
            return Ok(None);
        }

        let id = TopicId(self.topics.len() as u32);
        self.topics
            .push(TopicNode::new(title.to_string(), source_key.to_string()));
        self.topic_by_source.insert(source_key.to_string(), id);
        self.unplaced.insert(id, vec![candidate]);

        Ok(Some(id))
    }

    /// Attaches every offered topic under its chosen parent
    ///
    /// The shallowest linking page wins, ties going to the smallest parent
    /// source key. The topic takes the link title used by that parent.
    /// Returns the number of topics placed.
    pub fn place_topics(&mut self) -> Result<usize, TreeError> {
        let unplaced = std::mem::take(&mut self.unplaced);
        let placed = unplaced.len();

        for (id, candidates) in unplaced {
            let Some(chosen) = candidates
                .iter()
                .min_by(|a, b| {
                    a.depth
                        .cmp(&b.depth)
                        .then_with(|| self.source_key_of(a.parent).cmp(self.source_key_of(b.parent)))
                })
                .cloned()
            else {
                continue;
            };

            if candidates.len() > 1 {
                tracing::debug!(
                    "Topic {} linked from {} index pages, placed under {}",
                    id,
                    candidates.len(),
                    self.source_key_of(chosen.parent)
                );
            }

            let topic = self.topic_mut(id)?;
            topic.title = chosen.title;
            self.topic_mut(chosen.parent)?
                .push_child(NodeRef::Topic(id));
        }

        Ok(placed)
    }

    fn source_key_of(&self, id: TopicId) -> &str {
        self.topic(id).map(|t| t.source_key.as_str()).unwrap_or_default()
    }

    pub fn topic(&self, id: TopicId) -> Option<&TopicNode> {
        self.topics.get(id.0 as usize)
    }

    fn topic_mut(&mut self, id: TopicId) -> Result<&mut TopicNode, TreeError> {
        self.topics
            .get_mut(id.0 as usize)
            .ok_or(TreeError::UnknownTopic(id))
    }

    pub fn topics(&self) -> impl Iterator<Item = (TopicId, &TopicNode)> {
        self.topics
            .iter()
            .enumerate()
            .map(|(i, t)| (TopicId(i as u32), t))
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Top-level topics in creation order
    pub fn roots(&self) -> &[TopicId] {
        &self.roots
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DocumentRegistry {
        &mut self.registry
    }

    pub fn document(&self, id: DocumentId) -> Option<&DocumentNode> {
        self.registry.get(id)
    }

    /// Confirmed documents handed off for file retrieval, in confirmation order
    pub fn downloads(&self) -> &[DownloadJob] {
        &self.downloads
    }

    /// Attaches a confirmed document to `parent`
    ///
    /// Returns `Ok(false)` if the document is already a child of `parent`.
    /// Attaching a document that is not confirmed is an error.
    pub fn attach_document(
        &mut self,
        parent: TopicId,
        document: DocumentId,
        origin: PathOrigin,
    ) -> Result<bool, TreeError> {
        self.topic(parent).ok_or(TreeError::UnknownTopic(parent))?;

        let node = self.registry.get_mut(document)?;
        if !node.state.is_attachable() {
            return Err(TreeError::Unconfirmed {
                key: node.canonical_key.clone(),
                state: node.state,
            });
        }
        if node.parents.contains(&parent) {
            return Ok(false);
        }

        node.parents.push(parent);
        node.occurrence_count += 1;
        *node.occurrences_by_origin.entry(origin).or_insert(0) += 1;

        self.topic_mut(parent)?
            .push_child(NodeRef::Document(document));
        Ok(true)
    }

    /// Confirms a pending document and attaches it in the same step
    ///
    /// The artifact is recorded, the document moves to `Confirmed`, and it is
    /// attached to the originating parent followed by every waiting parent.
    /// Returns the parents it was newly attached to.
    pub fn confirm_document(
        &mut self,
        document: DocumentId,
        artifact: Artifact,
        origin: PendingParent,
    ) -> Result<Vec<TopicId>, TreeError> {
        self.registry
            .transition(document, DocumentState::Confirmed)?;

        let node = self.registry.get_mut(document)?;
        node.chosen_format = Some(artifact.format);
        node.artifact = Some(artifact.clone());

        self.downloads.push(DownloadJob {
            document,
            format: artifact.format,
            locator: artifact.locator,
        });

        let mut attached = Vec::new();
        let waiters = self.registry.take_waiters(document)?;
        for pending in std::iter::once(origin).chain(waiters) {
            if self.attach_document(pending.parent, document, pending.origin)? {
                attached.push(pending.parent);
            }
        }

        Ok(attached)
    }

    /// Discards a pending document, dropping every waiting parent
    ///
    /// Returns the waiters that were dropped.
    pub fn discard_document(
        &mut self,
        document: DocumentId,
    ) -> Result<Vec<PendingParent>, TreeError> {
        self.registry
            .transition(document, DocumentState::Discarded)?;
        self.registry.take_waiters(document)
    }

    /// Number of topics that list `document` among their children
    pub fn holders_of(&self, document: DocumentId) -> usize {
        self.topics
            .iter()
            .filter(|t| t.children().contains(&NodeRef::Document(document)))
            .count()
    }

    /// Order-independent description of the assembled tree
    ///
    /// One line per node path, sorted, so two runs whose sibling order
    /// differs still compare equal when their content is the same.
    pub fn fingerprint(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for root in &self.roots {
            self.fingerprint_topic(*root, String::new(), &mut lines);
        }
        lines.sort();
        lines
    }

    fn fingerprint_topic(&self, id: TopicId, prefix: String, lines: &mut Vec<String>) {
        let Some(topic) = self.topic(id) else {
            return;
        };
        let path = format!("{}/{}", prefix, topic.title);
        lines.push(format!("T {} [{}]", path, topic.source_key));

        for child in topic.children() {
            match child {
                NodeRef::Topic(child) => self.fingerprint_topic(*child, path.clone(), lines),
                NodeRef::Document(doc) => {
                    if let Some(node) = self.document(*doc) {
                        lines.push(format!(
                            "D {} [{}] x{}",
                            path, node.canonical_key, node.occurrence_count
                        ));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::node::ArtifactFormat;

    const BOOK: &str = "https://example.com/libro/94";

    fn artifact() -> Artifact {
        Artifact {
            format: ArtifactFormat::Epub,
            locator: "https://example.com/files/94.epub".to_string(),
        }
    }

    fn pending(parent: TopicId, origin: PathOrigin) -> PendingParent {
        PendingParent { parent, origin }
    }

    fn confirmable(ctx: &mut CrawlContext) -> DocumentId {
        let (id, _) = ctx.registry_mut().reserve(BOOK);
        ctx.registry_mut()
            .transition(id, DocumentState::PendingDownloadLink)
            .unwrap();
        id
    }

    #[test]
    fn test_topic_source_keys_are_unique() {
        let mut ctx = CrawlContext::new();
        let root = ctx.add_topic(None, "Categorías", "https://example.com/c").unwrap().unwrap();
        let child = ctx.add_topic(Some(root), "Novela", "https://example.com/c/novela").unwrap();
        assert!(child.is_some());

        let again = ctx.add_topic(Some(root), "Novela", "https://example.com/c/novela").unwrap();
        assert!(again.is_none());
        assert_eq!(ctx.topic(root).unwrap().children().len(), 1);
        assert_eq!(ctx.roots(), &[root]);
    }

    #[test]
    fn test_offered_topic_placement_ignores_offer_order() {
        let build = |first: &str, second: &str| {
            let mut ctx = CrawlContext::new();
            let root = ctx.add_topic(None, "Categorías", "https://example.com/c").unwrap().unwrap();
            let a = ctx.offer_topic(root, "A", "https://example.com/c/a", 0).unwrap().unwrap();
            let b = ctx.offer_topic(root, "B", "https://example.com/c/b", 0).unwrap().unwrap();
            let by_title = |t: &str| if t == "A" { a } else { b };

            let shared = ctx
                .offer_topic(by_title(first), first, "https://example.com/c/s", 1)
                .unwrap()
                .unwrap();
            assert!(ctx
                .offer_topic(by_title(second), second, "https://example.com/c/s", 1)
                .unwrap()
                .is_none());

            // Nothing is a child until placement
            assert!(ctx.topic(a).unwrap().children().is_empty());
            assert_eq!(ctx.place_topics().unwrap(), 3);
            assert_eq!(ctx.topic(a).unwrap().children(), &[NodeRef::Topic(shared)]);
            assert!(ctx.topic(b).unwrap().children().is_empty());
            assert_eq!(ctx.topic(shared).unwrap().title, "A");
            ctx.fingerprint()
        };

        assert_eq!(build("A", "B"), build("B", "A"));
    }

    #[test]
    fn test_shallowest_offer_wins() {
        let mut ctx = CrawlContext::new();
        let root = ctx.add_topic(None, "Root", "https://example.com/").unwrap().unwrap();
        let deep = ctx.offer_topic(root, "Z", "https://example.com/z", 0).unwrap().unwrap();
        let shared = ctx
            .offer_topic(deep, "Shared (deep)", "https://example.com/s", 1)
            .unwrap()
            .unwrap();
        ctx.offer_topic(root, "Shared", "https://example.com/s", 0).unwrap();

        // Links back to a root or to the page itself are not candidates
        assert!(ctx.offer_topic(shared, "Root", "https://example.com/", 2).unwrap().is_none());
        assert!(ctx.offer_topic(shared, "Self", "https://example.com/s", 2).unwrap().is_none());

        ctx.place_topics().unwrap();
        let children = ctx.topic(root).unwrap().children();
        assert!(children.contains(&NodeRef::Topic(shared)));
        assert!(children.contains(&NodeRef::Topic(deep)));
        assert!(ctx.topic(deep).unwrap().children().is_empty());
        assert_eq!(ctx.topic(shared).unwrap().title, "Shared");
        assert_eq!(ctx.roots(), &[root]);

        // Placement runs once per topic
        assert_eq!(ctx.place_topics().unwrap(), 0);
        assert_eq!(ctx.topic(root).unwrap().children().len(), 2);
    }

    #[test]
    fn test_unknown_parent_topic() {
        let mut ctx = CrawlContext::new();
        let err = ctx.add_topic(Some(TopicId(9)), "x", "https://example.com/x");
        assert!(matches!(err, Err(TreeError::UnknownTopic(TopicId(9)))));
    }

    #[test]
    fn test_pending_document_cannot_be_attached() {
        let mut ctx = CrawlContext::new();
        let root = ctx.add_topic(None, "Root", "https://example.com/").unwrap().unwrap();
        let id = confirmable(&mut ctx);

        let err = ctx.attach_document(root, id, PathOrigin::Category).unwrap_err();
        assert!(matches!(
            err,
            TreeError::Unconfirmed {
                state: DocumentState::PendingDownloadLink,
                ..
            }
        ));
        assert!(ctx.topic(root).unwrap().children().is_empty());
    }

    #[test]
    fn test_confirm_attaches_origin_and_waiters_once() {
        let mut ctx = CrawlContext::new();
        let root = ctx.add_topic(None, "Root", "https://example.com/").unwrap().unwrap();
        let a = ctx.add_topic(Some(root), "A", "https://example.com/a").unwrap().unwrap();
        let b = ctx.add_topic(Some(root), "B", "https://example.com/b").unwrap().unwrap();
        let id = confirmable(&mut ctx);

        ctx.registry_mut()
            .add_waiter(id, pending(b, PathOrigin::Collection))
            .unwrap();

        let attached = ctx
            .confirm_document(id, artifact(), pending(a, PathOrigin::Category))
            .unwrap();
        assert_eq!(attached, vec![a, b]);

        let node = ctx.document(id).unwrap();
        assert_eq!(node.state(), DocumentState::Confirmed);
        assert_eq!(node.occurrence_count(), 2);
        assert_eq!(node.parents(), &[a, b]);
        assert_eq!(node.occurrences_by_origin().get(&PathOrigin::Category), Some(&1));
        assert_eq!(node.occurrences_by_origin().get(&PathOrigin::Collection), Some(&1));
        assert_eq!(ctx.downloads().len(), 1);

        // Reattaching to the same parent is a no-op
        assert!(!ctx.attach_document(a, id, PathOrigin::Category).unwrap());
        assert_eq!(ctx.document(id).unwrap().occurrence_count(), 2);
        assert_eq!(ctx.holders_of(id), 2);
    }

    #[test]
    fn test_discard_drops_waiters() {
        let mut ctx = CrawlContext::new();
        let root = ctx.add_topic(None, "Root", "https://example.com/").unwrap().unwrap();
        let id = confirmable(&mut ctx);
        ctx.registry_mut()
            .add_waiter(id, pending(root, PathOrigin::Category))
            .unwrap();

        let dropped = ctx.discard_document(id).unwrap();
        assert_eq!(dropped.len(), 1);
        assert_eq!(ctx.document(id).unwrap().state(), DocumentState::Discarded);
        assert_eq!(ctx.holders_of(id), 0);
        assert!(ctx.attach_document(root, id, PathOrigin::Category).is_err());
    }

    #[test]
    fn test_fingerprint_ignores_sibling_order() {
        let build = |order: [(&str, &str); 2]| {
            let mut ctx = CrawlContext::new();
            let root = ctx.add_topic(None, "Root", "https://example.com/").unwrap().unwrap();
            for (title, key) in order {
                ctx.add_topic(Some(root), title, key).unwrap();
            }
            ctx.fingerprint()
        };

        let first = build([("A", "https://example.com/a"), ("B", "https://example.com/b")]);
        let second = build([("B", "https://example.com/b"), ("A", "https://example.com/a")]);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }
}
