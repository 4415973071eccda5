use crate::config::types::{
    Config, ConverterConfig, CrawlerConfig, SourceConfig, StateBackend, StateConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// Rule patterns are not compiled here; the rule engine does that when the
/// importer is built so that every pattern error carries its pattern kind.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_state_config(&config.state)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_converter_config(&config.converter)?;
    Ok(())
}

/// Validates the sitemap source
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.sitemap_url).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid sitemap_url '{}': {}",
            config.sitemap_url, e
        ))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "sitemap_url '{}' must use http or https",
            config.sitemap_url
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "source timeout_secs must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates the state backend selection
fn validate_state_config(config: &StateConfig) -> Result<(), ConfigError> {
    match config.backend {
        StateBackend::Memory => Ok(()),
        StateBackend::Json | StateBackend::Sqlite => match config.path.as_deref() {
            Some(path) if !path.trim().is_empty() => Ok(()),
            _ => Err(ConfigError::Validation(format!(
                "state path is required for the {:?} backend",
                config.backend
            ))),
        },
    }
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_pages < 1 || config.max_concurrent_pages > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_pages must be between 1 and 100, got {}",
            config.max_concurrent_pages
        )));
    }

    if config.page_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "page_timeout_secs must be > 0".to_string(),
        ));
    }

    if config.run_budget_secs == Some(0) {
        return Err(ConfigError::Validation(
            "run_budget_secs must be > 0 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::Validation(
            "user agent name cannot be empty".to_string(),
        ));
    }

    if !config.name.chars().all(|c| c.is_alphanumeric() || c == '-') {
        return Err(ConfigError::Validation(format!(
            "user agent name must contain only alphanumeric characters and hyphens, got '{}'",
            config.name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

/// Validates converter options
fn validate_converter_config(config: &ConverterConfig) -> Result<(), ConfigError> {
    if let Some(tags) = &config.remove_tags {
        for tag in tags {
            if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                return Err(ConfigError::Validation(format!(
                    "remove_tags entry '{}' is not a valid element name",
                    tag
                )));
            }
        }
    }
    Ok(())
}
