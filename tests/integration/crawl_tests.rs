//! Integration tests for the crawl engine
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! fetch, convert and write cycle end-to-end against a temporary directory.

use doc_harvest::config::FetchConfig;
use doc_harvest::crawler::{CrawlEngine, CrawlOptions, Termination};
use doc_harvest::output::{document_path, metadata_path, MarkdownWriter};
use doc_harvest::{Converter, HttpFetcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds an engine writing Markdown under `root`
fn create_engine(root: &Path) -> CrawlEngine {
    let fetcher = HttpFetcher::new(&FetchConfig::default()).expect("Failed to build fetcher");
    CrawlEngine::new(
        Arc::new(fetcher),
        Converter::default(),
        Arc::new(MarkdownWriter::new(root, true)),
    )
}

/// Expected output file for a page on the mock server
fn output_for(root: &Path, base_url: &str, page: &str) -> PathBuf {
    let url = Url::parse(&format!("{}{}", base_url, page)).expect("Failed to parse page URL");
    document_path(root, &url).expect("Failed to compute output path")
}

fn html(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(
            format!(
                "<html><head><title>{}</title></head><body><main>{}</main></body></html>",
                title, body
            ),
            "text/html; charset=utf-8",
        )
}

/// Mounts a home page linking to /page1, /page2 and /admin/settings
async fn mount_site(server: &MockServer) {
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            "Home",
            &format!(
                r#"<h1>Home</h1>
                <p>Welcome to the documentation.</p>
                <a href="{0}/page1">Page 1</a>
                <a href="/page2">Page 2</a>
                <a href="{0}/admin/settings">Admin</a>
                <a href="https://elsewhere.example.org/">External</a>"#,
                base_url
            ),
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html(
            "Page 1",
            r#"<h1>Page One</h1><p>First page.</p><a href="/">Home</a><a href="/page2">Next</a>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html("Page 2", "<h1>Page Two</h1><p>Second page.</p>"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/settings"))
        .respond_with(html("Admin", "<h1>Settings</h1>"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_seed_only_writes_one_document() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let base_url = mock_server.uri();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let engine = create_engine(temp_dir.path());
    let options = CrawlOptions {
        max_depth: 0,
        ..CrawlOptions::default()
    };

    let summary = engine
        .run(&CancellationToken::new(), &format!("{}/", base_url), &options)
        .await
        .expect("Crawl failed");

    assert_eq!(summary.termination, Termination::Exhausted);
    assert_eq!(summary.pages_fetched, 1);
    assert_eq!(summary.documents_written, 1);

    let index = output_for(temp_dir.path(), &base_url, "/");
    let content = std::fs::read_to_string(&index).expect("Home page was not written");
    assert!(content.contains("# Home"));
    assert!(!output_for(temp_dir.path(), &base_url, "/page1").exists());
}

#[tokio::test]
async fn test_follows_links_and_honors_exclusions() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let base_url = mock_server.uri();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let engine = create_engine(temp_dir.path());
    let options = CrawlOptions {
        max_depth: 2,
        concurrency: 3,
        exclude_patterns: vec!["/admin".to_string()],
        ..CrawlOptions::default()
    };

    let summary = engine
        .run(&CancellationToken::new(), &format!("{}/", base_url), &options)
        .await
        .expect("Crawl failed");

    assert_eq!(summary.termination, Termination::Exhausted);
    assert_eq!(summary.documents_written, 3);
    assert_eq!(summary.pages_failed, 0);

    for page in ["/", "/page1", "/page2"] {
        assert!(
            output_for(temp_dir.path(), &base_url, page).exists(),
            "{} was not written",
            page
        );
    }
    assert!(!output_for(temp_dir.path(), &base_url, "/admin/settings").exists());

    // Excluded and off-site pages are never requested
    let requests = mock_server
        .received_requests()
        .await
        .expect("Request recording disabled");
    assert!(requests.iter().all(|r| r.url.path() != "/admin/settings"));
}

#[tokio::test]
async fn test_each_page_fetched_once() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let base_url = mock_server.uri();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let engine = create_engine(temp_dir.path());
    let options = CrawlOptions {
        max_depth: 3,
        concurrency: 4,
        ..CrawlOptions::default()
    };

    engine
        .run(&CancellationToken::new(), &format!("{}/", base_url), &options)
        .await
        .expect("Crawl failed");

    let requests = mock_server
        .received_requests()
        .await
        .expect("Request recording disabled");
    for page in ["/", "/page1", "/page2", "/admin/settings"] {
        let count = requests.iter().filter(|r| r.url.path() == page).count();
        assert_eq!(count, 1, "{} fetched {} times", page, count);
    }
}

#[tokio::test]
async fn test_limit_stops_crawl() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let base_url = mock_server.uri();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let engine = create_engine(temp_dir.path());
    let options = CrawlOptions {
        max_depth: 2,
        concurrency: 2,
        limit: Some(2),
        ..CrawlOptions::default()
    };

    let summary = engine
        .run(&CancellationToken::new(), &format!("{}/", base_url), &options)
        .await
        .expect("Crawl failed");

    assert_eq!(summary.termination, Termination::LimitReached);
    assert_eq!(summary.documents_written, 2);

    let written = walk_markdown(temp_dir.path());
    assert_eq!(written.len(), 2, "unexpected files: {:?}", written);
}

#[tokio::test]
async fn test_markdown_page_kept_verbatim() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/guide.md"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("# Guide\n\nSome *emphasis* here.\n\n\n\nEnd.\n", "text/plain"),
        )
        .mount(&mock_server)
        .await;

    let engine = create_engine(temp_dir.path());
    let summary = engine
        .run(
            &CancellationToken::new(),
            &format!("{}/guide.md", base_url),
            &CrawlOptions::default(),
        )
        .await
        .expect("Crawl failed");
    assert_eq!(summary.documents_written, 1);

    let file = output_for(temp_dir.path(), &base_url, "/guide.md");
    assert!(file.ends_with("guide.md"));
    let content = std::fs::read_to_string(&file).expect("Guide was not written");
    assert!(content.starts_with("# Guide"));
    assert!(content.contains("Some *emphasis* here."));
    assert!(!content.contains("\n\n\n"));
}

#[tokio::test]
async fn test_metadata_sidecar_written() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let base_url = mock_server.uri();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let engine = create_engine(temp_dir.path()).with_source_name("crawler");
    let options = CrawlOptions {
        max_depth: 0,
        ..CrawlOptions::default()
    };
    engine
        .run(
            &CancellationToken::new(),
            &format!("{}/page1", base_url),
            &options,
        )
        .await
        .expect("Crawl failed");

    let sidecar = metadata_path(&output_for(temp_dir.path(), &base_url, "/page1"));
    let raw = std::fs::read_to_string(&sidecar).expect("Sidecar was not written");
    let meta: serde_json::Value = serde_json::from_str(&raw).expect("Sidecar is not JSON");

    assert_eq!(meta["title"], "Page 1");
    assert_eq!(meta["source_strategy"], "crawler");
    assert_eq!(meta["cache_hit"], false);
    assert_eq!(meta["content_hash"].as_str().map(str::len), Some(64));
    assert!(meta["word_count"].as_u64().unwrap_or(0) > 0);
}

#[tokio::test]
async fn test_missing_seed_is_fatal() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let engine = create_engine(temp_dir.path());
    let result = engine
        .run(
            &CancellationToken::new(),
            &format!("{}/missing", base_url),
            &CrawlOptions::default(),
        )
        .await;

    let err = result.expect_err("Seed failure should abort the crawl");
    assert!(err.to_string().contains("/missing"));
    assert!(walk_markdown(temp_dir.path()).is_empty());
}

#[tokio::test]
async fn test_existing_output_skipped_unless_forced() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let base_url = mock_server.uri();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let seed = format!("{}/page2", base_url);

    let options = CrawlOptions {
        max_depth: 0,
        ..CrawlOptions::default()
    };

    let first = create_engine(temp_dir.path())
        .run(&CancellationToken::new(), &seed, &options)
        .await
        .expect("First crawl failed");
    assert_eq!(first.documents_written, 1);

    let second = create_engine(temp_dir.path())
        .run(&CancellationToken::new(), &seed, &options)
        .await
        .expect("Second crawl failed");
    assert_eq!(second.documents_written, 0);
    assert_eq!(second.pages_skipped, 1);

    let forced = CrawlOptions {
        force: true,
        ..options
    };
    let third = create_engine(temp_dir.path())
        .run(&CancellationToken::new(), &seed, &forced)
        .await
        .expect("Forced crawl failed");
    assert_eq!(third.documents_written, 1);
}

/// Collects every `.md` file below `root`
fn walk_markdown(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "md") {
                found.push(path);
            }
        }
    }

    found
}
