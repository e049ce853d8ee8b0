//! Content tree model
//!
//! Topics and documents live in arenas owned by a [`CrawlContext`]; a topic's
//! children are [`NodeRef`] handles, so every parent reaching the same book
//! holds the very same [`DocumentId`].

mod context;
mod node;
mod registry;

pub use context::CrawlContext;
pub use node::{
    Artifact, ArtifactFormat, DocumentId, DocumentMetadata, DocumentNode, DownloadJob, NodeRef,
    PathOrigin, PendingParent, TopicId, TopicNode,
};
pub use registry::DocumentRegistry;

use crate::state::DocumentState;
use thiserror::Error;

/// Errors raised by tree and registry mutations
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Document {key} is {state} and cannot be attached")]
    Unconfirmed { key: String, state: DocumentState },

    #[error("Invalid state transition for {key}: {from} -> {to}")]
    InvalidTransition {
        key: String,
        from: DocumentState,
        to: DocumentState,
    },

    #[error("Unknown document: {0}")]
    UnknownDocument(DocumentId),

    #[error("Unknown topic: {0}")]
    UnknownTopic(TopicId),
}
