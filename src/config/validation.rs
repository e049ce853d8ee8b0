use crate::config::types::{
    CatalogConfig, ChannelConfig, Config, CrawlerConfig, OutputConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_channel_config(&config.channel)?;
    validate_catalog_config(&config.catalog)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_channel_config(config: &ChannelConfig) -> Result<(), ConfigError> {
    if config.title.trim().is_empty() {
        return Err(ConfigError::Validation(
            "channel title cannot be empty".to_string(),
        ));
    }

    if config.source_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "channel source-id cannot be empty".to_string(),
        ));
    }

    if config.license.trim().is_empty() {
        return Err(ConfigError::Validation(
            "channel license cannot be empty".to_string(),
        ));
    }

    let lang_len = config.language.len();
    if !(2..=8).contains(&lang_len) {
        return Err(ConfigError::Validation(format!(
            "channel language must be a 2-8 character code, got '{}'",
            config.language
        )));
    }

    Ok(())
}

/// Validates the taxonomy entry points
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    if config.category_root.is_none() && config.collections_root.is_none() {
        return Err(ConfigError::Validation(
            "at least one of category-root or collections-root must be set".to_string(),
        ));
    }

    for root in [&config.category_root, &config.collections_root]
        .into_iter()
        .flatten()
    {
        validate_root_url(root)?;
    }

    Ok(())
}

fn validate_root_url(root: &str) -> Result<(), ConfigError> {
    let url = Url::parse(root)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid root URL '{}': {}", root, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "Root URL '{}' must use HTTP or HTTPS",
            root
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 64, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.occurrence_warning < 1 {
        return Err(ConfigError::Validation(
            "occurrence_warning must be >= 1".to_string(),
        ));
    }

    if config.occurrence_ceiling <= config.occurrence_warning {
        return Err(ConfigError::Validation(format!(
            "occurrence_ceiling ({}) must be greater than occurrence_warning ({})",
            config.occurrence_ceiling, config.occurrence_warning
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, path) in [
        ("tree_path", &config.tree_path),
        ("downloads_path", &config.downloads_path),
        ("summary_path", &config.summary_path),
    ] {
        if path.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
