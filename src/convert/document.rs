use crate::convert::metadata::{content_hash, word_count};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use url::Url;

/// A converted page, ready for the writer
#[derive(Debug, Clone)]
pub struct Document {
    pub url: String,
    pub title: String,
    pub description: String,
    /// Markdown body
    pub content: String,
    /// Decoded source HTML, kept only when requested
    pub raw_html: Option<String>,
    /// SHA-256 hex digest of `content`
    pub content_hash: String,
    pub word_count: usize,
    /// Byte length of `content`
    pub char_count: usize,
    /// Absolute http(s) links in first-seen order
    pub links: Vec<String>,
    /// Heading texts keyed by `"h1"`..`"h6"`
    pub headings: BTreeMap<String, Vec<String>>,
    pub rendered_with_js: bool,
    /// Name of the strategy that produced the document
    pub source_strategy: String,
    pub cache_hit: bool,
    pub fetched_at: DateTime<Utc>,
}

impl Document {
    /// Builds a document, deriving the digest and counts from `content`
    pub fn new(
        url: &Url,
        title: Option<String>,
        description: Option<String>,
        content: String,
        headings: BTreeMap<String, Vec<String>>,
        links: Vec<String>,
    ) -> Self {
        Self {
            url: url.to_string(),
            title: title.unwrap_or_default(),
            description: description.unwrap_or_default(),
            content_hash: content_hash(&content),
            word_count: word_count(&content),
            char_count: content.len(),
            content,
            raw_html: None,
            links,
            headings,
            rendered_with_js: false,
            source_strategy: String::new(),
            cache_hit: false,
            fetched_at: Utc::now(),
        }
    }

    pub fn with_raw_html(mut self, raw_html: Option<String>) -> Self {
        self.raw_html = raw_html;
        self
    }

    /// Records which strategy produced the document and whether it came from cache
    pub fn with_source(mut self, strategy: &str, cache_hit: bool) -> Self {
        self.source_strategy = strategy.to_string();
        self.cache_hit = cache_hit;
        self
    }

    /// Every field except the content and raw HTML, for the metadata sidecar
    pub fn metadata(&self) -> DocumentMetadata<'_> {
        DocumentMetadata {
            url: &self.url,
            title: &self.title,
            description: &self.description,
            content_hash: &self.content_hash,
            word_count: self.word_count,
            char_count: self.char_count,
            links: &self.links,
            headings: &self.headings,
            rendered_with_js: self.rendered_with_js,
            source_strategy: &self.source_strategy,
            cache_hit: self.cache_hit,
            fetched_at: self.fetched_at,
        }
    }
}

/// Serializable view of a document's metadata
#[derive(Debug, Serialize)]
pub struct DocumentMetadata<'a> {
    pub url: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub content_hash: &'a str,
    pub word_count: usize,
    pub char_count: usize,
    pub links: &'a [String],
    pub headings: &'a BTreeMap<String, Vec<String>>,
    pub rendered_with_js: bool,
    pub source_strategy: &'a str,
    pub cache_hit: bool,
    pub fetched_at: DateTime<Utc>,
}
