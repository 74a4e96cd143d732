//! Resilient HTTP fetch layer
//!
//! This module handles every network read for doc-harvest, including:
//! - Cache lookups keyed by the normalized URL
//! - Retry with exponential backoff for transient failures
//! - `Retry-After` hints from rate-limiting servers
//! - Redirect following and a per-fetcher cookie jar
//! - Error classification through the `source()` chain

mod client;
mod error;
mod retry;

pub use client::{build_http_client, HttpFetcher};
pub use error::{is_retryable, is_retryable_status, parse_retry_after, retry_after, FetchError};
pub use retry::{retry, RetryPolicy};

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;

/// A fetched response
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status_code: u16,
    pub body: Vec<u8>,
    /// Raw `Content-Type` header, empty when absent
    pub content_type: String,
    /// URL after redirects
    pub final_url: String,
    pub from_cache: bool,
}

/// Source of page bytes for the crawl engine and strategies
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url` with default headers
    async fn get(&self, cancel: &CancellationToken, url: &str) -> Result<FetchResult, FetchError> {
        self.get_with_headers(cancel, url, &HeaderMap::new()).await
    }

    /// Fetches `url` with extra request headers
    async fn get_with_headers(
        &self,
        cancel: &CancellationToken,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<FetchResult, FetchError>;

    /// Cookies the server has set for `url`, as name/value pairs
    fn get_cookies(&self, url: &str) -> Vec<(String, String)>;

    /// Releases held resources
    async fn close(&self) -> Result<(), FetchError>;
}
