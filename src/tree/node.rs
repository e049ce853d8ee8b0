//! Node types of the assembled content tree.

use crate::state::DocumentState;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a topic within a crawl context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicId(pub u32);

/// Identifier of a document within the document registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub u32);

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "topic#{}", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "document#{}", self.0)
    }
}

/// A child entry of a topic: either a nested topic or a shared document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Topic(TopicId),
    Document(DocumentId),
}

/// Which taxonomy led the crawler to a document reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathOrigin {
    Category,
    Collection,
}

impl PathOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Collection => "collection",
        }
    }
}

impl fmt::Display for PathOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A topic (category, collection, or taxonomy root).
///
/// Children are only ever appended.
#[derive(Debug, Clone)]
pub struct TopicNode {
    pub title: String,
    /// Canonical URL of the index page the topic was created from
    pub source_key: String,
    children: Vec<NodeRef>,
}

impl TopicNode {
    pub(crate) fn new(title: String, source_key: String) -> Self {
        Self {
            title,
            source_key,
            children: Vec::new(),
        }
    }

    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    pub(crate) fn push_child(&mut self, child: NodeRef) {
        self.children.push(child);
    }
}

/// Downloadable artifact formats offered by a book page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Reflowable ebook; preferred whenever offered
    Epub,
    /// Fixed-layout fallback
    Pdf,
}

impl ArtifactFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Epub => "epub",
            Self::Pdf => "pdf",
        }
    }

    /// Recognizes a format from a download button label
    pub fn from_label(label: &str) -> Option<Self> {
        if label.contains("ePub") || label.contains("EPUB") || label.contains("epub") {
            Some(Self::Epub)
        } else if label.contains("PDF") || label.contains("pdf") {
            Some(Self::Pdf)
        } else {
            None
        }
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A confirmed downloadable artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub format: ArtifactFormat,
    pub locator: String,
}

/// Descriptive fields scraped from a book page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: Option<String>,
    pub description: String,
    pub thumbnail: Option<String>,
}

/// A parent that reached a document while it was still being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingParent {
    pub parent: TopicId,
    pub origin: PathOrigin,
}

/// A book, shared by every topic that reaches it.
#[derive(Debug, Clone)]
pub struct DocumentNode {
    pub canonical_key: String,
    pub metadata: DocumentMetadata,
    pub(crate) state: DocumentState,
    pub(crate) chosen_format: Option<ArtifactFormat>,
    pub(crate) artifact: Option<Artifact>,
    pub(crate) occurrence_count: u32,
    pub(crate) occurrences_by_origin: BTreeMap<PathOrigin, u32>,
    pub(crate) parents: Vec<TopicId>,
    pub(crate) waiting: Vec<PendingParent>,
}

impl DocumentNode {
    pub(crate) fn reserved(canonical_key: String) -> Self {
        Self {
            canonical_key,
            metadata: DocumentMetadata::default(),
            state: DocumentState::PendingMetadata,
            chosen_format: None,
            artifact: None,
            occurrence_count: 0,
            occurrences_by_origin: BTreeMap::new(),
            parents: Vec::new(),
            waiting: Vec::new(),
        }
    }

    pub fn state(&self) -> DocumentState {
        self.state
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn chosen_format(&self) -> Option<ArtifactFormat> {
        self.chosen_format
    }

    pub fn occurrence_count(&self) -> u32 {
        self.occurrence_count
    }

    pub fn occurrences_by_origin(&self) -> &BTreeMap<PathOrigin, u32> {
        &self.occurrences_by_origin
    }

    /// Topics holding this document, in attach order
    pub fn parents(&self) -> &[TopicId] {
        &self.parents
    }

    pub fn waiting(&self) -> &[PendingParent] {
        &self.waiting
    }
}

/// Handoff of a confirmed document to the file retrieval stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub document: DocumentId,
    pub format: ArtifactFormat,
    pub locator: String,
}
