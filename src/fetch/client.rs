//! reqwest-backed fetcher with response caching

use crate::cache::{cache_key, Cache};
use crate::config::FetchConfig;
use crate::fetch::error::{parse_retry_after, FetchError};
use crate::fetch::retry::{retry, RetryPolicy};
use crate::fetch::{FetchResult, Fetcher};
use crate::url::normalize_url;
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{redirect::Policy, Client};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Maximum redirect hops before a request fails
const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetch configuration
/// * `jar` - Cookie jar shared with the owning fetcher
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetchConfig, jar: Arc<Jar>) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .cookie_provider(jar)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Header stored in front of the body of each cached response
#[derive(Debug, Serialize, Deserialize)]
struct CachedResponse {
    status_code: u16,
    content_type: String,
    final_url: String,
}

/// Encodes a response as `<json header>\n<body>`
fn encode_cached(result: &FetchResult) -> Result<Vec<u8>, serde_json::Error> {
    let header = CachedResponse {
        status_code: result.status_code,
        content_type: result.content_type.clone(),
        final_url: result.final_url.clone(),
    };

    let mut encoded = serde_json::to_vec(&header)?;
    encoded.push(b'\n');
    encoded.extend_from_slice(&result.body);
    Ok(encoded)
}

fn decode_cached(bytes: &[u8]) -> Option<FetchResult> {
    let split = bytes.iter().position(|&b| b == b'\n')?;
    let header: CachedResponse = serde_json::from_slice(&bytes[..split]).ok()?;

    Some(FetchResult {
        status_code: header.status_code,
        body: bytes[split + 1..].to_vec(),
        content_type: header.content_type,
        final_url: header.final_url,
        from_cache: true,
    })
}

/// HTTP fetcher with retry, redirects, cookies and an optional response cache
pub struct HttpFetcher {
    client: Client,
    jar: Arc<Jar>,
    cache: Option<Arc<dyn Cache>>,
    cache_ttl: Duration,
    policy: RetryPolicy,
}

impl HttpFetcher {
    /// Creates a fetcher without a cache, using the default retry policy
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let jar = Arc::new(Jar::default());
        let client = build_http_client(config, Arc::clone(&jar))?;

        Ok(Self {
            client,
            jar,
            cache: None,
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            policy: RetryPolicy::default(),
        })
    }

    /// Attaches a response cache; successful responses live for `ttl`
    pub fn with_cache(mut self, cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn read_cache(&self, key: &str, url: &Url) -> Option<FetchResult> {
        let cache = self.cache.as_ref()?;
        match cache.get(key) {
            Ok(Some(bytes)) => {
                let result = decode_cached(&bytes);
                if result.is_none() {
                    tracing::debug!("Discarding unreadable cache entry for {}", url);
                }
                result
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", url, e);
                None
            }
        }
    }

    fn write_cache(&self, key: &str, url: &Url, result: &FetchResult) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };

        let stored = encode_cached(result)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                cache
                    .set(key, &bytes, self.cache_ttl)
                    .map_err(|e| e.to_string())
            });

        if let Err(e) = stored {
            tracing::warn!("Cache write failed for {}: {}", url, e);
        }
    }

    /// Performs a single request without retries
    async fn send_once(
        &self,
        cancel: &CancellationToken,
        url: &Url,
        headers: &HeaderMap,
    ) -> Result<FetchResult, FetchError> {
        let request = self.client.get(url.clone()).headers(headers.clone());

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            sent = request.send() => sent.map_err(|e| FetchError::from_reqwest(url.as_str(), e))?,
        };

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            return Err(FetchError::from_status(
                url.as_str(),
                status.as_u16(),
                retry_after,
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            body = response.bytes() => body.map_err(|e| FetchError::from_reqwest(url.as_str(), e))?,
        };

        Ok(FetchResult {
            status_code: status.as_u16(),
            body: body.to_vec(),
            content_type,
            final_url,
            from_cache: false,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get_with_headers(
        &self,
        cancel: &CancellationToken,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<FetchResult, FetchError> {
        let normalized = normalize_url(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let key = cache_key(&normalized);
        if let Some(cached) = self.read_cache(&key, &normalized) {
            tracing::debug!("Cache hit: {}", normalized);
            return Ok(cached);
        }

        let target = &normalized;
        let result = retry(&self.policy, cancel, move |attempt| {
            if attempt > 0 {
                tracing::debug!("Retry {} for {}", attempt, target);
            }
            self.send_once(cancel, target, headers)
        })
        .await?;

        tracing::debug!("Fetched {} ({})", normalized, result.status_code);
        self.write_cache(&key, &normalized, &result);

        Ok(result)
    }

    fn get_cookies(&self, url: &str) -> Vec<(String, String)> {
        let Ok(url) = Url::parse(url) else {
            return Vec::new();
        };

        self.jar
            .cookies(&url)
            .and_then(|header| header.to_str().ok().map(parse_cookie_header))
            .unwrap_or_default()
    }

    async fn close(&self) -> Result<(), FetchError> {
        if let Some(cache) = &self.cache {
            cache.close()?;
        }
        Ok(())
    }
}

/// Splits a `Cookie` header value into name/value pairs
fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}
