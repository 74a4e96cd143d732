use crate::convert::{CodeBlockStyle, HeadingStyle, MarkdownOptions};
use crate::crawler::CrawlOptions;
use crate::fetch::RetryPolicy;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for doc-harvest
///
/// Every section and field has a default, so an empty file is a valid
/// configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    pub output: OutputConfig,
    pub markdown: MarkdownConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Maximum link depth from the seed URL (0 = seed only)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Number of concurrent workers
    pub concurrency: usize,

    /// Maximum number of documents to write
    pub limit: Option<usize>,

    /// Regex patterns; matching links are never enqueued
    #[serde(rename = "exclude-patterns")]
    pub exclude_patterns: Vec<String>,

    /// CSS selector preferred over heuristic content extraction
    #[serde(rename = "content-selector")]
    pub content_selector: Option<String>,

    /// Restrict traversal to links starting with this URL
    #[serde(rename = "filter-url")]
    pub filter_url: Option<String>,

    /// Run the pipeline without writing output
    #[serde(rename = "dry-run")]
    pub dry_run: bool,

    /// Overwrite existing output instead of skipping
    pub force: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 0,
            concurrency: 5,
            limit: None,
            exclude_patterns: Vec::new(),
            content_selector: None,
            filter_url: None,
            dry_run: false,
            force: false,
        }
    }
}

/// HTTP fetch and retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Total request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connection timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Delay before the first retry (milliseconds)
    #[serde(rename = "initial-interval-ms")]
    pub initial_interval_ms: u64,

    /// Upper bound for any single backoff delay (milliseconds)
    #[serde(rename = "max-interval-ms")]
    pub max_interval_ms: u64,

    /// Backoff growth factor per attempt
    pub multiplier: f64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("doc-harvest/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_retries: 3,
            initial_interval_ms: 1000,
            max_interval_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether fetched responses are cached
    pub enabled: bool,

    /// Path to the SQLite cache database
    pub path: String,

    /// Lifetime of a cached response (seconds)
    #[serde(rename = "ttl-secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: ".doc-harvest/cache.db".to_string(),
            ttl_secs: 24 * 60 * 60,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the Markdown files
    pub directory: String,

    /// Write a JSON metadata record next to each document
    #[serde(rename = "write-metadata")]
    pub write_metadata: bool,

    /// Keep the decoded source HTML on each document
    #[serde(rename = "keep-raw-html")]
    pub keep_raw_html: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "./harvested".to_string(),
            write_metadata: true,
            keep_raw_html: false,
        }
    }
}

/// Markdown rendering configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// "atx" (`# Title`) or "setext" (underlined h1/h2)
    #[serde(rename = "heading-style")]
    pub heading_style: HeadingStyle,

    /// List bullet marker: "-" or "*"
    pub bullet: String,

    /// "fenced" or "indented"
    #[serde(rename = "code-block-style")]
    pub code_block_style: CodeBlockStyle,

    /// Fence for fenced code blocks; only its character (backtick or tilde) is used
    pub fence: String,

    /// Emphasis delimiter: "_" or "*"
    #[serde(rename = "em-delimiter")]
    pub em_delimiter: String,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        let defaults = MarkdownOptions::default();
        Self {
            heading_style: defaults.heading_style,
            bullet: defaults.bullet.to_string(),
            code_block_style: defaults.code_block_style,
            fence: defaults.fence,
            em_delimiter: defaults.em_delimiter.to_string(),
        }
    }
}

impl Config {
    /// Builds the crawl options described by the `[crawl]` section
    pub fn crawl_options(&self) -> CrawlOptions {
        CrawlOptions {
            max_depth: self.crawl.max_depth,
            concurrency: self.crawl.concurrency,
            limit: self.crawl.limit,
            exclude_patterns: self.crawl.exclude_patterns.clone(),
            content_selector: self.crawl.content_selector.clone(),
            filter_url: self.crawl.filter_url.clone(),
            dry_run: self.crawl.dry_run,
            force: self.crawl.force,
        }
    }

    /// Builds the retry policy described by the `[fetch]` section
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.fetch.max_retries,
            Duration::from_millis(self.fetch.initial_interval_ms),
            Duration::from_millis(self.fetch.max_interval_ms),
            self.fetch.multiplier,
        )
    }

    /// Builds the Markdown renderer options described by the `[markdown]` section
    pub fn markdown_options(&self) -> MarkdownOptions {
        let defaults = MarkdownOptions::default();
        MarkdownOptions {
            heading_style: self.markdown.heading_style,
            bullet: self.markdown.bullet.chars().next().unwrap_or(defaults.bullet),
            code_block_style: self.markdown.code_block_style,
            fence: self.markdown.fence.clone(),
            em_delimiter: self
                .markdown
                .em_delimiter
                .chars()
                .next()
                .unwrap_or(defaults.em_delimiter),
        }
    }

    /// Cache entry lifetime
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}
