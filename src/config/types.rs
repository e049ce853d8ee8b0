use serde::Deserialize;

/// Main configuration structure for Catalog-Weaver
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub channel: ChannelConfig,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Metadata describing the published channel
///
/// Carried through unchanged into the exported tree for the publishing stage.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Human readable channel name
    pub title: String,

    /// Stable channel identifier
    #[serde(rename = "source-id")]
    pub source_id: String,

    /// Domain of the content provider
    pub domain: String,

    /// Language code of the channel content
    pub language: String,

    #[serde(default)]
    pub description: String,

    /// Channel thumbnail image, path or URL
    #[serde(default)]
    pub thumbnail: Option<String>,

    /// License every published document is released under
    #[serde(default = "default_license")]
    pub license: String,

    /// Provider credited on every document; the channel title when unset
    #[serde(default)]
    pub provider: Option<String>,
}

impl ChannelConfig {
    pub fn provider_name(&self) -> &str {
        self.provider.as_deref().unwrap_or(&self.title)
    }
}

/// Entry points of the two taxonomies
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Index page of the hierarchical category tree
    #[serde(rename = "category-root", default)]
    pub category_root: Option<String>,

    /// Index page listing the curated collections
    #[serde(rename = "collections-root", default)]
    pub collections_root: Option<String>,

    /// Number of category index levels walked as branches before the
    /// walker switches to leaf mode
    #[serde(rename = "category-branch-levels", default)]
    pub category_branch_levels: u32,

    /// Title of the top-level categories topic
    #[serde(rename = "categories-title", default = "default_categories_title")]
    pub categories_title: String,

    /// Title of the top-level collections topic
    #[serde(rename = "collections-title", default = "default_collections_title")]
    pub collections_title: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of fetches in flight at once
    #[serde(rename = "max-concurrent-requests", default = "default_max_concurrent")]
    pub max_concurrent_requests: u32,

    /// Occurrence count above which a document is reported as a warning
    #[serde(rename = "occurrence-warning", default = "default_occurrence_warning")]
    pub occurrence_warning: u32,

    /// Occurrence count above which the run is aborted as anomalous
    #[serde(rename = "occurrence-ceiling", default = "default_occurrence_ceiling")]
    pub occurrence_ceiling: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent(),
            occurrence_warning: default_occurrence_warning(),
            occurrence_ceiling: default_occurrence_ceiling(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the exported JSON content tree
    #[serde(rename = "tree-path")]
    pub tree_path: String,

    /// Path of the JSON download manifest
    #[serde(rename = "downloads-path")]
    pub downloads_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}

fn default_license() -> String {
    "public-domain".to_string()
}

fn default_categories_title() -> String {
    "Categorías".to_string()
}

fn default_collections_title() -> String {
    "Colecciones".to_string()
}

fn default_max_concurrent() -> u32 {
    8
}

fn default_occurrence_warning() -> u32 {
    2
}

fn default_occurrence_ceiling() -> u32 {
    16
}
