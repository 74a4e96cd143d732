//! Source strategies and the dispatcher that picks one
//!
//! Every input URL is classified into a closed set of [`StrategyType`]s by
//! [`detect_strategy`] and turned into a [`Strategy`] by [`create_strategy`].
//! All strategies share the same fetcher, converter and writer, and all of
//! them end up driving the [`CrawlEngine`].

mod archive;
mod crawl;
mod detect;
mod link_list;
mod registry;
mod sitemap;
mod wiki;

pub use archive::{readme_url, SourceArchiveStrategy};
pub use crawl::CrawlerStrategy;
pub use detect::{
    detect_strategy, is_crawlable, is_link_list, is_package_registry, is_sitemap,
    is_source_archive, is_wiki, PACKAGE_REGISTRY_DOMAIN, VCS_HOSTS,
};
pub use link_list::LinkListStrategy;
pub use registry::PackageRegistryStrategy;
pub use sitemap::{parse_sitemap, SitemapDocument, SitemapKind, SitemapStrategy};
pub use wiki::{wiki_base_url, WikiStrategy};

use crate::convert::Converter;
use crate::crawler::{CrawlEngine, CrawlOptions, CrawlSummary};
use crate::fetch::Fetcher;
use crate::output::Writer;
use crate::HarvestError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// The kinds of source a URL can be harvested from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyType {
    Crawler,
    SourceArchive,
    Sitemap,
    LinkList,
    PackageRegistry,
    Wiki,
    Unknown,
}

impl StrategyType {
    /// Stable name recorded on documents and printed by `--detect`
    pub fn name(&self) -> &'static str {
        match self {
            Self::Crawler => "crawler",
            Self::SourceArchive => "source-archive",
            Self::Sitemap => "sitemap",
            Self::LinkList => "link-list",
            Self::PackageRegistry => "package-registry",
            Self::Wiki => "wiki",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised by strategies
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("No strategy can handle {input:?}")]
    Unknown { input: String },

    #[error("Strategy type {0} cannot be instantiated")]
    UnsupportedType(StrategyType),

    #[error("{strategy} cannot handle {url}: {reason}")]
    InvalidInput {
        strategy: &'static str,
        url: String,
        reason: String,
    },

    #[error("Compressed sitemap {url} is not supported")]
    CompressedSitemap { url: String },

    #[error("Malformed sitemap {url}: {source}")]
    MalformedSitemap {
        url: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("{strategy} strategy failed for {url}: {source}")]
    Failed {
        strategy: &'static str,
        url: String,
        #[source]
        source: Box<HarvestError>,
    },

    #[error("Operation cancelled")]
    Cancelled,
}

impl StrategyError {
    /// Wraps an engine or fetch error with the strategy and URL it came from
    ///
    /// Cancellation is never wrapped.
    pub fn failed(strategy: &'static str, url: &str, err: impl Into<HarvestError>) -> Self {
        let err = err.into();
        if err.is_cancelled() {
            return Self::Cancelled;
        }
        Self::Failed {
            strategy,
            url: url.to_string(),
            source: Box::new(err),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Failed { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Shared collaborators handed to every strategy
#[derive(Clone)]
pub struct StrategyDeps {
    pub fetcher: Arc<dyn Fetcher>,
    pub converter: Converter,
    pub writer: Arc<dyn Writer>,
}

impl StrategyDeps {
    pub fn new(fetcher: Arc<dyn Fetcher>, converter: Converter, writer: Arc<dyn Writer>) -> Self {
        Self {
            fetcher,
            converter,
            writer,
        }
    }

    /// A crawl engine that tags documents with `strategy`
    pub fn engine(&self, strategy: &str) -> CrawlEngine {
        CrawlEngine::new(
            self.fetcher.clone(),
            self.converter.clone(),
            self.writer.clone(),
        )
        .with_source_name(strategy)
    }
}

/// A handler for one class of source URL
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Name recorded as the document source
    fn name(&self) -> &'static str;

    /// Returns true for every input the classifier assigns to this strategy
    fn can_handle(&self, url: &str) -> bool;

    /// Harvests `url`, handing every produced document to the writer
    ///
    /// # Arguments
    ///
    /// * `cancel` - Token that aborts the run with [`StrategyError::Cancelled`]
    /// * `url` - The input URL
    /// * `options` - Crawl options; strategies may tighten depth or add a selector
    async fn execute(
        &self,
        cancel: &CancellationToken,
        url: &str,
        options: &CrawlOptions,
    ) -> Result<CrawlSummary, StrategyError>;
}

/// Instantiates the strategy for `kind`
///
/// # Errors
///
/// [`StrategyType::Unknown`] yields [`StrategyError::UnsupportedType`].
pub fn create_strategy(
    kind: StrategyType,
    deps: StrategyDeps,
) -> Result<Box<dyn Strategy>, StrategyError> {
    let strategy: Box<dyn Strategy> = match kind {
        StrategyType::Crawler => Box::new(CrawlerStrategy::new(deps)),
        StrategyType::SourceArchive => Box::new(SourceArchiveStrategy::new(deps)),
        StrategyType::Sitemap => Box::new(SitemapStrategy::new(deps)),
        StrategyType::LinkList => Box::new(LinkListStrategy::new(deps)),
        StrategyType::PackageRegistry => Box::new(PackageRegistryStrategy::new(deps)),
        StrategyType::Wiki => Box::new(WikiStrategy::new(deps)),
        StrategyType::Unknown => return Err(StrategyError::UnsupportedType(kind)),
    };
    Ok(strategy)
}

/// Classifies `url` and builds the matching strategy in one step
pub fn strategy_for(url: &str, deps: StrategyDeps) -> Result<Box<dyn Strategy>, StrategyError> {
    match detect_strategy(url) {
        StrategyType::Unknown => Err(StrategyError::Unknown {
            input: url.to_string(),
        }),
        kind => create_strategy(kind, deps),
    }
}
