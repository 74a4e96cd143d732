//! doc-harvest: documentation harvester
//!
//! This crate fetches documentation from websites, sitemaps, link lists,
//! wikis, package registries and source hosts, and normalizes every page into
//! a Markdown [`Document`](convert::Document) with consistent metadata.

pub mod cache;
pub mod config;
pub mod convert;
pub mod crawler;
pub mod fetch;
pub mod output;
pub mod strategy;
pub mod url;

use thiserror::Error;

pub use cache::CacheError;
pub use convert::ConvertError;
pub use fetch::FetchError;
pub use output::OutputError;
pub use strategy::StrategyError;

/// Main error type for doc-harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Conversion failed for {url}: {source}")]
    Convert {
        url: String,
        #[source]
        source: ConvertError,
    },

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error("Seed URL {url} failed: {source}")]
    SeedFailed {
        url: String,
        #[source]
        source: Box<HarvestError>,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

impl HarvestError {
    /// Returns true if this error, at any wrap depth, is a cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Fetch(FetchError::Cancelled) => true,
            Self::SeedFailed { source, .. } => source.is_cancelled(),
            Self::Strategy(err) => err.is_cancelled(),
            _ => false,
        }
    }
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

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("URL is empty")]
    Empty,

    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for doc-harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use convert::{Converter, Document};
pub use crawler::{CrawlEngine, CrawlOptions, CrawlSummary};
pub use fetch::{FetchResult, Fetcher, HttpFetcher, RetryPolicy};
pub use strategy::{create_strategy, detect_strategy, Strategy, StrategyDeps, StrategyType};
pub use url::{normalize_url, validate_url};
