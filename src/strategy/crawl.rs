use crate::crawler::{CrawlOptions, CrawlSummary};
use crate::strategy::detect::is_crawlable;
use crate::strategy::{Strategy, StrategyDeps, StrategyError, StrategyType};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Generic website crawl from the input URL with the caller's options
pub struct CrawlerStrategy {
    deps: StrategyDeps,
}

impl CrawlerStrategy {
    pub fn new(deps: StrategyDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Strategy for CrawlerStrategy {
    fn name(&self) -> &'static str {
        StrategyType::Crawler.name()
    }

    fn can_handle(&self, url: &str) -> bool {
        is_crawlable(url)
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        url: &str,
        options: &CrawlOptions,
    ) -> Result<CrawlSummary, StrategyError> {
        self.deps
            .engine(self.name())
            .run(cancel, url, options)
            .await
            .map_err(|e| StrategyError::failed(self.name(), url, e))
    }
}
