//! Integration tests for the HTTP fetcher
//!
//! Retry, caching, redirect and cookie behavior is exercised against
//! wiremock servers.

use doc_harvest::cache::{Cache, SqliteCache};
use doc_harvest::config::FetchConfig;
use doc_harvest::fetch::{FetchError, Fetcher, HttpFetcher, RetryPolicy};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Retry policy with millisecond backoff so tests stay fast
fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(
        max_retries,
        Duration::from_millis(10),
        Duration::from_millis(50),
        2.0,
    )
}

fn create_fetcher(max_retries: u32) -> HttpFetcher {
    HttpFetcher::new(&FetchConfig::default())
        .expect("Failed to build fetcher")
        .with_retry_policy(fast_policy(max_retries))
}

async fn request_count(server: &MockServer, page: &str) -> usize {
    server
        .received_requests()
        .await
        .expect("Request recording disabled")
        .iter()
        .filter(|r| r.url.path() == page)
        .count()
}

#[tokio::test]
async fn test_rate_limit_retried_until_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>ok</body></html>", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(3);
    let result = fetcher
        .get(
            &CancellationToken::new(),
            &format!("{}/docs", mock_server.uri()),
        )
        .await
        .expect("Fetch should succeed after retries");

    assert_eq!(result.status_code, 200);
    assert_eq!(result.content_type, "text/html");
    assert!(!result.from_cache);
    assert_eq!(request_count(&mock_server, "/docs").await, 3);
}

#[tokio::test]
async fn test_retries_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(2);
    let result = fetcher
        .get(
            &CancellationToken::new(),
            &format!("{}/flaky", mock_server.uri()),
        )
        .await;

    assert!(matches!(
        result,
        Err(FetchError::Status { status: 503, .. })
    ));
    // One attempt plus two retries
    assert_eq!(request_count(&mock_server, "/flaky").await, 3);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(3);
    let result = fetcher
        .get(
            &CancellationToken::new(),
            &format!("{}/missing", mock_server.uri()),
        )
        .await;

    let err = result.expect_err("404 should fail");
    assert_eq!(err.status(), Some(404));
    assert_eq!(request_count(&mock_server, "/missing").await, 1);
}

#[tokio::test]
async fn test_retry_after_header_honored() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_string("done"))
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(3);
    let started = Instant::now();
    let result = fetcher
        .get(
            &CancellationToken::new(),
            &format!("{}/slow", mock_server.uri()),
        )
        .await
        .expect("Fetch should succeed after waiting");

    assert_eq!(result.body, b"done");
    // The server hint replaces the 10ms backoff
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_cancel_interrupts_backoff() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(3);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let result = fetcher
        .get(&cancel, &format!("{}/limited", mock_server.uri()))
        .await;

    assert!(matches!(result, Err(FetchError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_cached_response_skips_network() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cached"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("# Cached", "text/markdown"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let cache = Arc::new(SqliteCache::open_in_memory().expect("Failed to open cache"));
    let fetcher = create_fetcher(3).with_cache(cache.clone(), Duration::from_secs(60));
    let cancel = CancellationToken::new();
    let url = format!("{}/cached", mock_server.uri());

    let first = fetcher.get(&cancel, &url).await.expect("First fetch failed");
    assert!(!first.from_cache);

    // Fragment differences normalize to the same cache key
    let second = fetcher
        .get(&cancel, &format!("{}#section", url))
        .await
        .expect("Second fetch failed");
    assert!(second.from_cache);
    assert_eq!(second.body, first.body);
    assert_eq!(second.content_type, "text/markdown");
    assert_eq!(second.final_url, first.final_url);

    let stats = cache.stats().expect("Failed to read cache stats");
    assert_eq!(stats.entries, 1);
}

#[tokio::test]
async fn test_failed_responses_not_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let cache = Arc::new(SqliteCache::open_in_memory().expect("Failed to open cache"));
    let fetcher = create_fetcher(1).with_cache(cache.clone(), Duration::from_secs(60));

    let result = fetcher
        .get(
            &CancellationToken::new(),
            &format!("{}/gone", mock_server.uri()),
        )
        .await;
    assert!(result.is_err());
    assert_eq!(cache.stats().expect("Failed to read cache stats").entries, 0);
}

#[tokio::test]
async fn test_redirect_reports_final_url() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/new", base_url).as_str()),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(1);
    let result = fetcher
        .get(&CancellationToken::new(), &format!("{}/old", base_url))
        .await
        .expect("Redirect should be followed");

    assert_eq!(result.status_code, 200);
    assert_eq!(result.final_url, format!("{}/new", base_url));
    assert_eq!(result.body, b"moved");
}

#[tokio::test]
async fn test_cookies_retained_between_requests() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "session=abc123; Path=/")
                .set_body_string("welcome"),
        )
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(1);
    fetcher
        .get(&CancellationToken::new(), &format!("{}/login", base_url))
        .await
        .expect("Login fetch failed");

    let cookies = fetcher.get_cookies(&format!("{}/docs", base_url));
    assert_eq!(
        cookies,
        vec![("session".to_string(), "abc123".to_string())]
    );
    assert!(fetcher.close().await.is_ok());
}
