//! JSON export of the assembled tree and the download manifest
//!
//! The tree export is the handoff to the publishing stage: channel metadata
//! plus the ordered top-level topics with every attached document nested
//! under each of its parents. The download manifest lists one entry per
//! confirmed document for the file retrieval stage.

use crate::config::ChannelConfig;
use crate::crawler::RunStatus;
use crate::output::OutputResult;
use crate::tree::{Artifact, ArtifactFormat, CrawlContext, NodeRef, PathOrigin, TopicId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Channel metadata carried into the export
#[derive(Debug, Clone, Serialize)]
pub struct ExportChannel {
    pub title: String,
    pub source_id: String,
    pub domain: String,
    pub language: String,
    pub description: String,
    pub thumbnail: Option<String>,
}

impl From<&ChannelConfig> for ExportChannel {
    fn from(channel: &ChannelConfig) -> Self {
        Self {
            title: channel.title.clone(),
            source_id: channel.source_id.clone(),
            domain: channel.domain.clone(),
            language: channel.language.clone(),
            description: channel.description.clone(),
            thumbnail: channel.thumbnail.clone(),
        }
    }
}

/// A node of the exported tree
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExportNode {
    Topic {
        title: String,
        source_id: String,
        children: Vec<ExportNode>,
    },
    Document {
        source_id: String,
        title: String,
        author: Option<String>,
        description: String,
        thumbnail: Option<String>,
        license: String,
        provider: String,
        artifact: Option<Artifact>,
        occurrences: u32,
        occurrences_by_origin: BTreeMap<PathOrigin, u32>,
    },
}

/// The exported tree
#[derive(Debug, Clone, Serialize)]
pub struct ExportTree {
    pub channel: ExportChannel,
    pub status: RunStatus,
    pub roots: Vec<ExportNode>,
}

/// One file to retrieve
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadEntry {
    pub source_id: String,
    pub title: String,
    pub format: ArtifactFormat,
    pub locator: String,
}

/// Builds the exported tree from a crawl context
pub fn build_export(ctx: &CrawlContext, channel: &ChannelConfig, status: RunStatus) -> ExportTree {
    ExportTree {
        channel: channel.into(),
        status,
        roots: ctx
            .roots()
            .iter()
            .filter_map(|root| export_topic(ctx, channel, *root))
            .collect(),
    }
}

/// Every document is published under the channel's license and provider
fn export_topic(ctx: &CrawlContext, channel: &ChannelConfig, id: TopicId) -> Option<ExportNode> {
    let topic = ctx.topic(id)?;
    let children = topic
        .children()
        .iter()
        .filter_map(|child| match child {
            NodeRef::Topic(child) => export_topic(ctx, channel, *child),
            NodeRef::Document(doc) => {
                let node = ctx.document(*doc)?;
                Some(ExportNode::Document {
                    source_id: node.canonical_key.clone(),
                    title: node.metadata.title.clone(),
                    author: node.metadata.author.clone(),
                    description: node.metadata.description.clone(),
                    thumbnail: node.metadata.thumbnail.clone(),
                    license: channel.license.clone(),
                    provider: channel.provider_name().to_string(),
                    artifact: node.artifact().cloned(),
                    occurrences: node.occurrence_count(),
                    occurrences_by_origin: node.occurrences_by_origin().clone(),
                })
            }
        })
        .collect();

    Some(ExportNode::Topic {
        title: topic.title.clone(),
        source_id: topic.source_key.clone(),
        children,
    })
}

/// Builds the download manifest in confirmation order
pub fn build_downloads(ctx: &CrawlContext) -> Vec<DownloadEntry> {
    ctx.downloads()
        .iter()
        .filter_map(|job| {
            let node = ctx.document(job.document)?;
            Some(DownloadEntry {
                source_id: node.canonical_key.clone(),
                title: node.metadata.title.clone(),
                format: job.format,
                locator: job.locator.clone(),
            })
        })
        .collect()
}

/// Writes a value as pretty-printed JSON
pub fn write_json<T: Serialize>(value: &T, output_path: &Path) -> OutputResult<()> {
    let json = serde_json::to_string_pretty(value)?;

    let mut file = File::create(output_path)?;
    file.write_all(json.as_bytes())?;
    file.write_all(b"\n")?;

    Ok(())
}
