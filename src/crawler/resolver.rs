//! Leaf resolver: turns book references into shared document nodes.
//!
//! A book goes through two fetches before it may appear in the tree: its
//! own page (metadata and offered formats) and the confirmation page of the
//! chosen format (artifact locator). Only a confirmed document is attached,
//! and confirmation attaches it to its originating parent in the same step.

use crate::crawler::parser::{DownloadOffer, PageRecord};
use crate::crawler::scheduler::{Continuation, FrontierItem};
use crate::state::DocumentState;
use crate::tree::{
    Artifact, ArtifactFormat, CrawlContext, DocumentId, DocumentMetadata, PathOrigin,
    PendingParent, TopicId, TreeError,
};
use url::Url;

/// What happened when a listing reached a book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First sighting: the document was reserved and its page must be fetched
    Fetch(DocumentId),
    /// Already confirmed: attached to the parent without a fetch
    Attached(DocumentId),
    /// Already confirmed and already held by this parent
    AlreadyAttached(DocumentId),
    /// Still being resolved: the parent waits for the outcome
    Waiting(DocumentId),
    /// Previously discarded: nothing to do
    Rejected(DocumentId),
}

/// Outcome of feeding a fetched page to the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Metadata recorded; the confirmation page must be fetched next
    Pending(FrontierItem),
    /// The document was confirmed and attached to these parents
    Confirmed { attached: Vec<TopicId> },
    /// The document was discarded, dropping this many waiting parents
    Discarded { dropped: usize },
}

/// Admits a book reference found under `parent`
pub fn admit(
    ctx: &mut CrawlContext,
    canonical_key: &str,
    parent: TopicId,
    origin: PathOrigin,
) -> Result<Admission, TreeError> {
    let (document, created) = ctx.registry_mut().reserve(canonical_key);
    if created {
        return Ok(Admission::Fetch(document));
    }

    let state = ctx
        .document(document)
        .map(|node| node.state())
        .ok_or(TreeError::UnknownDocument(document))?;

    match state {
        DocumentState::Confirmed => {
            if ctx.attach_document(parent, document, origin)? {
                tracing::debug!("Attached confirmed {} under {}", canonical_key, parent);
                Ok(Admission::Attached(document))
            } else {
                Ok(Admission::AlreadyAttached(document))
            }
        }
        DocumentState::Discarded => Ok(Admission::Rejected(document)),
        DocumentState::PendingMetadata | DocumentState::PendingDownloadLink => {
            ctx.registry_mut()
                .add_waiter(document, PendingParent { parent, origin })?;
            Ok(Admission::Waiting(document))
        }
    }
}

/// Picks the format to download: ePub when offered, otherwise PDF
pub fn choose_format(offers: &[DownloadOffer]) -> Option<(ArtifactFormat, &Url)> {
    let find = |format: ArtifactFormat| {
        offers
            .iter()
            .find(|offer| ArtifactFormat::from_label(&offer.label) == Some(format))
            .map(|offer| (format, &offer.url))
    };
    find(ArtifactFormat::Epub).or_else(|| find(ArtifactFormat::Pdf))
}

/// Records a book page's metadata and schedules its confirmation page
///
/// A book offering neither ePub nor PDF is discarded.
pub fn resolve_book(
    ctx: &mut CrawlContext,
    record: &PageRecord,
    document: DocumentId,
    parent: TopicId,
    origin: PathOrigin,
) -> Result<Resolution, TreeError> {
    let fields = &record.fields;
    let metadata = DocumentMetadata {
        title: fields.title.clone().unwrap_or_default(),
        author: fields.author.clone(),
        description: fields.paragraphs.join("\n\n"),
        thumbnail: fields.thumbnail.clone(),
    };
    ctx.registry_mut().get_mut(document)?.metadata = metadata;

    let Some((format, url)) = choose_format(&fields.download_offers) else {
        let key = canonical_key_of(ctx, document);
        let dropped = ctx.discard_document(document)?;
        tracing::error!("No downloadable format offered for {}, discarding", key);
        return Ok(Resolution::Discarded {
            dropped: dropped.len(),
        });
    };

    ctx.registry_mut()
        .transition(document, DocumentState::PendingDownloadLink)?;

    tracing::debug!(
        "{} offers {}, fetching confirmation page {}",
        canonical_key_of(ctx, document),
        format,
        url
    );

    Ok(Resolution::Pending(FrontierItem::new(
        url.clone(),
        Continuation::Download {
            document,
            parent,
            origin,
            format,
        },
    )))
}

/// Confirms a document from its confirmation page
///
/// Without an artifact locator the document is discarded and its waiting
/// parents are dropped.
pub fn confirm_download(
    ctx: &mut CrawlContext,
    record: &PageRecord,
    document: DocumentId,
    parent: TopicId,
    origin: PathOrigin,
    format: ArtifactFormat,
) -> Result<Resolution, TreeError> {
    let Some(locator) = record.fields.artifact_locator.clone() else {
        let key = canonical_key_of(ctx, document);
        let dropped = ctx.discard_document(document)?;
        tracing::error!(
            "No {} download link on {} for {}, discarding",
            format,
            record.url,
            key
        );
        return Ok(Resolution::Discarded {
            dropped: dropped.len(),
        });
    };

    let attached = ctx.confirm_document(
        document,
        Artifact { format, locator },
        PendingParent { parent, origin },
    )?;

    tracing::info!(
        "Confirmed {} ({}) under {} parent(s)",
        canonical_key_of(ctx, document),
        format,
        attached.len()
    );

    Ok(Resolution::Confirmed { attached })
}

/// Discards a document whose resolution can no longer complete
///
/// Returns `None` if the document had already settled.
pub fn abandon(ctx: &mut CrawlContext, document: DocumentId) -> Result<Option<Resolution>, TreeError> {
    let pending = ctx
        .document(document)
        .map(|node| node.state().is_pending())
        .ok_or(TreeError::UnknownDocument(document))?;
    if !pending {
        return Ok(None);
    }

    let key = canonical_key_of(ctx, document);
    let dropped = ctx.discard_document(document)?;
    tracing::warn!("Discarding unresolved {}", key);
    Ok(Some(Resolution::Discarded {
        dropped: dropped.len(),
    }))
}

fn canonical_key_of(ctx: &CrawlContext, document: DocumentId) -> String {
    ctx.document(document)
        .map(|node| node.canonical_key.clone())
        .unwrap_or_else(|| document.to_string())
}
