//! Sitemap strategy
//!
//! Fetches a sitemap, follows `sitemapindex` children up to
//! [`MAX_INDEX_DEPTH`] levels and processes every listed page at depth 0.

use crate::convert::decode_text;
use crate::crawler::{CrawlOptions, CrawlSummary};
use crate::strategy::detect::is_sitemap;
use crate::strategy::{Strategy, StrategyDeps, StrategyError, StrategyType};
use crate::HarvestError;
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::{HashSet, VecDeque};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Levels of nested sitemap indexes followed below the input sitemap
pub const MAX_INDEX_DEPTH: u32 = 3;

/// Leading bytes of a gzip stream
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Root element of a sitemap document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapKind {
    /// `<urlset>`: locations are pages
    UrlSet,
    /// `<sitemapindex>`: locations are further sitemaps
    Index,
}

/// The `<loc>` entries of one sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapDocument {
    pub kind: SitemapKind,
    pub locations: Vec<String>,
}

/// Parses sitemap XML into its kind and `<loc>` values
///
/// Namespace prefixes are ignored and other elements (`lastmod`,
/// `priority`, ...) are skipped.
///
/// # Example
///
/// ```
/// use doc_harvest::strategy::{parse_sitemap, SitemapKind};
///
/// let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
///   <url><loc>https://example.com/a</loc></url>
/// </urlset>"#;
/// let doc = parse_sitemap(xml).unwrap();
/// assert_eq!(doc.kind, SitemapKind::UrlSet);
/// assert_eq!(doc.locations, vec!["https://example.com/a"]);
/// ```
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut kind = SitemapKind::UrlSet;
    let mut locations = Vec::new();
    let mut current = String::new();
    let mut in_loc = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sitemapindex" => kind = SitemapKind::Index,
                b"loc" => {
                    in_loc = true;
                    current.clear();
                }
                _ => {}
            },
            Event::Text(text) if in_loc => current.push_str(&text.unescape()?),
            Event::CData(data) if in_loc => {
                current.push_str(&String::from_utf8_lossy(&data.into_inner()))
            }
            Event::End(e) if e.local_name().as_ref() == b"loc" => {
                in_loc = false;
                let loc = current.trim();
                if !loc.is_empty() {
                    locations.push(loc.to_string());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(SitemapDocument { kind, locations })
}

/// Pages listed by a sitemap or sitemap index
pub struct SitemapStrategy {
    deps: StrategyDeps,
}

impl SitemapStrategy {
    pub fn new(deps: StrategyDeps) -> Self {
        Self { deps }
    }

    /// Fetches and parses one sitemap, resolving locations against its URL
    async fn load(
        &self,
        cancel: &CancellationToken,
        url: &str,
    ) -> Result<(SitemapKind, Vec<String>), StrategyError> {
        let response = self
            .deps
            .fetcher
            .get(cancel, url)
            .await
            .map_err(|e| StrategyError::failed(self.name(), url, e))?;

        if response.body.starts_with(&GZIP_MAGIC) {
            return Err(StrategyError::CompressedSitemap {
                url: url.to_string(),
            });
        }

        let text = decode_text(&response.body, &response.content_type).map_err(|source| {
            StrategyError::failed(
                self.name(),
                url,
                HarvestError::Convert {
                    url: url.to_string(),
                    source,
                },
            )
        })?;

        let doc = parse_sitemap(&text).map_err(|source| StrategyError::MalformedSitemap {
            url: url.to_string(),
            source,
        })?;

        let base = Url::parse(&response.final_url)
            .or_else(|_| Url::parse(url))
            .map_err(|e| StrategyError::InvalidInput {
                strategy: self.name(),
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let locations = doc
            .locations
            .iter()
            .filter_map(|loc| base.join(loc).ok())
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .map(String::from)
            .collect();

        Ok((doc.kind, locations))
    }

    /// Walks the sitemap tree breadth-first and returns the page URLs
    ///
    /// Failure of the input sitemap is fatal; failures of nested sitemaps are
    /// logged and skipped.
    async fn collect_pages(
        &self,
        cancel: &CancellationToken,
        url: &str,
    ) -> Result<Vec<String>, StrategyError> {
        let mut pending = VecDeque::from([(url.to_string(), 0u32)]);
        let mut seen_sitemaps = HashSet::new();
        let mut seen_pages = HashSet::new();
        let mut pages = Vec::new();

        while let Some((sitemap_url, level)) = pending.pop_front() {
            if !seen_sitemaps.insert(sitemap_url.clone()) {
                continue;
            }

            let (kind, locations) = match self.load(cancel, &sitemap_url).await {
                Ok(loaded) => loaded,
                Err(e) if level == 0 || e.is_cancelled() => return Err(e),
                Err(e) => {
                    tracing::warn!("Skipping sitemap {}: {}", sitemap_url, e);
                    continue;
                }
            };

            match kind {
                SitemapKind::UrlSet => {
                    tracing::debug!("Sitemap {} lists {} pages", sitemap_url, locations.len());
                    for loc in locations {
                        if seen_pages.insert(loc.clone()) {
                            pages.push(loc);
                        }
                    }
                }
                SitemapKind::Index if level >= MAX_INDEX_DEPTH => {
                    tracing::warn!(
                        "Not descending into sitemap index {} beyond depth {}",
                        sitemap_url,
                        MAX_INDEX_DEPTH
                    );
                }
                SitemapKind::Index => {
                    tracing::debug!(
                        "Sitemap index {} lists {} sitemaps",
                        sitemap_url,
                        locations.len()
                    );
                    pending.extend(locations.into_iter().map(|loc| (loc, level + 1)));
                }
            }
        }

        Ok(pages)
    }
}

#[async_trait]
impl Strategy for SitemapStrategy {
    fn name(&self) -> &'static str {
        StrategyType::Sitemap.name()
    }

    fn can_handle(&self, url: &str) -> bool {
        is_sitemap(url)
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        url: &str,
        options: &CrawlOptions,
    ) -> Result<CrawlSummary, StrategyError> {
        let pages = self.collect_pages(cancel, url).await?;
        if pages.is_empty() {
            tracing::warn!("Sitemap {} lists no pages", url);
            return Ok(CrawlSummary::default());
        }

        tracing::info!("Sitemap {} lists {} pages", url, pages.len());
        let options = CrawlOptions {
            max_depth: 0,
            ..options.clone()
        };

        self.deps
            .engine(self.name())
            .run_batch(cancel, &pages, &options)
            .await
            .map_err(|e| StrategyError::failed(self.name(), url, e))
    }
}
