use crate::config::types::{CacheConfig, Config, CrawlConfig, FetchConfig, MarkdownConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_fetch_config(&config.fetch)?;
    validate_cache_config(&config.cache)?;
    validate_output_directory(&config.output.directory)?;
    validate_markdown_config(&config.markdown)?;
    Ok(())
}

/// Validates crawl configuration
///
/// Exclude patterns are not checked here; invalid ones are skipped when the
/// crawl compiles them.
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.limit == Some(0) {
        return Err(ConfigError::Validation(
            "limit must be >= 1 when set".to_string(),
        ));
    }

    if let Some(selector) = &config.content_selector {
        validate_selector(selector)?;
    }

    if let Some(filter_url) = &config.filter_url {
        Url::parse(filter_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid filter-url: {}", e)))?;
    }

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs must be >= 1".to_string(),
        ));
    }

    if !config.multiplier.is_finite() || config.multiplier < 0.0 {
        return Err(ConfigError::Validation(format!(
            "multiplier must be a non-negative number, got {}",
            config.multiplier
        )));
    }

    Ok(())
}

/// Validates cache configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.enabled && config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "cache path cannot be empty when the cache is enabled".to_string(),
        ));
    }

    Ok(())
}

/// Validates the output directory
fn validate_output_directory(directory: &str) -> Result<(), ConfigError> {
    if directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates Markdown rendering options
fn validate_markdown_config(config: &MarkdownConfig) -> Result<(), ConfigError> {
    if !matches!(config.bullet.as_str(), "-" | "*") {
        return Err(ConfigError::Validation(format!(
            "bullet must be '-' or '*', got '{}'",
            config.bullet
        )));
    }

    if !matches!(config.em_delimiter.as_str(), "_" | "*") {
        return Err(ConfigError::Validation(format!(
            "em-delimiter must be '_' or '*', got '{}'",
            config.em_delimiter
        )));
    }

    validate_fence(&config.fence)?;

    Ok(())
}

/// A fence is three or more backticks or tildes
fn validate_fence(fence: &str) -> Result<(), ConfigError> {
    let valid = fence.len() >= 3
        && (fence.chars().all(|c| c == '`') || fence.chars().all(|c| c == '~'));

    if !valid {
        return Err(ConfigError::Validation(format!(
            "fence must be three or more backticks or tildes, got '{}'",
            fence
        )));
    }

    Ok(())
}

/// Validates that a CSS selector parses
pub fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}
