//! Catalog-Weaver: a two-taxonomy catalog crawler
//!
//! This crate crawls a remote book catalog organized as a hierarchical
//! category tree and a flat list of curated collections, and assembles a
//! single deduplicated content tree ready for a publishing stage.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod tree;
pub mod url;

use thiserror::Error;

/// Main error type for Catalog-Weaver operations
#[derive(Debug, Error)]
pub enum WeaverError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Tree error: {0}")]
    Tree(#[from] tree::TreeError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Catalog-Weaver operations
pub type Result<T> = std::result::Result<T, WeaverError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CancelToken, Coordinator, CrawlOutcome, RunStatus};
pub use state::DocumentState;
pub use tree::{CrawlContext, DocumentId, NodeRef, PathOrigin, TopicId};
pub use url::canonical_key;
