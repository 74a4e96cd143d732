//! Integration tests for the source strategies
//!
//! Sitemaps, link lists and registry pages are served by wiremock and
//! harvested into an in-memory writer.

use doc_harvest::config::FetchConfig;
use doc_harvest::crawler::CrawlOptions;
use doc_harvest::output::MemoryWriter;
use doc_harvest::strategy::{strategy_for, StrategyError};
use doc_harvest::{create_strategy, detect_strategy, Converter, HttpFetcher, RetryPolicy};
use doc_harvest::{StrategyDeps, StrategyType};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Dependencies backed by a real fetcher and an in-memory writer
fn create_deps() -> (StrategyDeps, Arc<MemoryWriter>) {
    let fetcher = HttpFetcher::new(&FetchConfig::default())
        .expect("Failed to build fetcher")
        .with_retry_policy(RetryPolicy::new(
            1,
            Duration::from_millis(10),
            Duration::from_millis(20),
            2.0,
        ));
    let writer = Arc::new(MemoryWriter::new());
    let deps = StrategyDeps::new(Arc::new(fetcher), Converter::default(), writer.clone());
    (deps, writer)
}

fn html(title: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(
            format!(
                r#"<html><head><title>{0}</title></head>
            <body><nav>Site navigation</nav><main><h1>{0}</h1><p>Body of {0}.</p>
            <a href="/elsewhere">More</a></main></body></html>"#,
                title
            ),
            "text/html",
        )
}

fn xml(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(body, "application/xml")
}

async fn mount_pages(server: &MockServer, pages: &[&str]) {
    for page in pages {
        Mock::given(method("GET"))
            .and(path(*page))
            .respond_with(html(page.trim_start_matches('/')))
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn test_sitemap_index_followed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(xml(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>{0}/sitemap-docs.xml</loc></sitemap>
  <sitemap><loc>/sitemap-missing.xml</loc></sitemap>
</sitemapindex>"#,
            base_url
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemap-docs.xml"))
        .respond_with(xml(format!(
            r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{0}/alpha</loc><lastmod>2024-05-01</lastmod></url>
  <url><loc>{0}/beta</loc></url>
  <url><loc>{0}/alpha</loc></url>
</urlset>"#,
            base_url
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemap-missing.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    mount_pages(&mock_server, &["/alpha", "/beta"]).await;

    let (deps, writer) = create_deps();
    let strategy = create_strategy(StrategyType::Sitemap, deps).expect("Failed to build strategy");
    let summary = strategy
        .execute(
            &CancellationToken::new(),
            &format!("{}/sitemap.xml", base_url),
            &CrawlOptions::default(),
        )
        .await
        .expect("Sitemap harvest failed");

    assert_eq!(summary.documents_written, 2);
    assert_eq!(
        writer.urls(),
        vec![format!("{}/alpha", base_url), format!("{}/beta", base_url)]
    );
    assert!(writer
        .documents()
        .iter()
        .all(|doc| doc.source_strategy == "sitemap"));

    // Listed pages are processed at depth 0, so their links are not followed
    let requests = mock_server
        .received_requests()
        .await
        .expect("Request recording disabled");
    assert!(requests.iter().all(|r| r.url.path() != "/elsewhere"));
}

#[tokio::test]
async fn test_compressed_sitemap_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sitemap.xml.gz"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00])
                .insert_header("content-type", "application/octet-stream"),
        )
        .mount(&mock_server)
        .await;

    let (deps, writer) = create_deps();
    let strategy = create_strategy(StrategyType::Sitemap, deps).expect("Failed to build strategy");
    let result = strategy
        .execute(
            &CancellationToken::new(),
            &format!("{}/sitemap.xml.gz", mock_server.uri()),
            &CrawlOptions::default(),
        )
        .await;

    assert!(matches!(result, Err(StrategyError::CompressedSitemap { .. })));
    assert!(writer.is_empty());
}

#[tokio::test]
async fn test_malformed_sitemap_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(xml(
            "<urlset><url><loc>https://example.com/</url></urlset>".to_string(),
        ))
        .mount(&mock_server)
        .await;

    let (deps, _writer) = create_deps();
    let strategy = create_strategy(StrategyType::Sitemap, deps).expect("Failed to build strategy");
    let result = strategy
        .execute(
            &CancellationToken::new(),
            &format!("{}/sitemap.xml", mock_server.uri()),
            &CrawlOptions::default(),
        )
        .await;

    assert!(matches!(result, Err(StrategyError::MalformedSitemap { .. })));
}

#[tokio::test]
async fn test_link_list_pages_harvested() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/llms.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(
                    format!(
                        "# Project\n\n> Summary line\n\n## Docs\n\n\
                         - [Getting started](/start): first steps\n\
                         - [Reference]({}/reference)\n\
                         - [Mail us](mailto:team@example.com)\n",
                        base_url
                    ),
                    "text/plain; charset=utf-8",
                ),
        )
        .mount(&mock_server)
        .await;

    mount_pages(&mock_server, &["/start", "/reference"]).await;

    let (deps, writer) = create_deps();
    let url = format!("{}/llms.txt", base_url);
    let strategy = strategy_for(&url, deps).expect("Failed to build strategy");
    assert_eq!(strategy.name(), "link-list");

    let summary = strategy
        .execute(&CancellationToken::new(), &url, &CrawlOptions::default())
        .await
        .expect("Link list harvest failed");

    assert_eq!(summary.documents_written, 2);
    assert_eq!(
        writer.urls(),
        vec![
            format!("{}/reference", base_url),
            format!("{}/start", base_url)
        ]
    );
}

#[tokio::test]
async fn test_registry_page_uses_main_region() {
    let mock_server = MockServer::start().await;
    mount_pages(&mock_server, &["/net/http"]).await;

    let (deps, writer) = create_deps();
    let strategy =
        create_strategy(StrategyType::PackageRegistry, deps).expect("Failed to build strategy");
    let summary = strategy
        .execute(
            &CancellationToken::new(),
            &format!("{}/net/http", mock_server.uri()),
            &CrawlOptions {
                max_depth: 5,
                ..CrawlOptions::default()
            },
        )
        .await
        .expect("Registry harvest failed");

    assert_eq!(summary.documents_written, 1);
    let docs = writer.documents();
    assert!(docs[0].content.contains("Body of net/http."));
    assert!(!docs[0].content.contains("Site navigation"));
    assert_eq!(docs[0].source_strategy, "package-registry");
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let mock_server = MockServer::start().await;
    mount_pages(&mock_server, &["/docs"]).await;

    let (deps, writer) = create_deps();
    let url = format!("{}/docs", mock_server.uri());
    let strategy = strategy_for(&url, deps).expect("Failed to build strategy");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = strategy
        .execute(&cancel, &url, &CrawlOptions::default())
        .await;

    let err = result.expect_err("Cancelled run should fail");
    assert!(err.is_cancelled());
    assert!(writer.is_empty());
}

#[test]
fn test_detection_covers_every_source() {
    let cases = [
        ("https://github.com/rust-lang/rust/wiki", StrategyType::Wiki),
        ("https://github.com/rust-lang/rust", StrategyType::SourceArchive),
        ("git@gitlab.com:group/project.git", StrategyType::SourceArchive),
        ("https://docs.example.com/sitemap.xml", StrategyType::Sitemap),
        ("https://docs.example.com/llms.txt", StrategyType::LinkList),
        ("https://pkg.go.dev/golang.org/x/net", StrategyType::PackageRegistry),
        ("https://docs.example.com/guide/", StrategyType::Crawler),
        ("file:///etc/passwd", StrategyType::Unknown),
    ];

    for (input, expected) in cases {
        assert_eq!(detect_strategy(input), expected, "{}", input);
    }
}
