//! Configuration module for Catalog-Weaver
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use catalog_weaver::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("weaver.toml")).unwrap();
//! println!("Concurrency: {}", config.crawler.max_concurrent_requests);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CatalogConfig, ChannelConfig, Config, CrawlerConfig, OutputConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
