use crate::convert::{decode_text, markdown_links};
use crate::crawler::{CrawlOptions, CrawlSummary};
use crate::strategy::detect::is_link_list;
use crate::strategy::{Strategy, StrategyDeps, StrategyError, StrategyType};
use crate::HarvestError;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Pages listed as Markdown links in an `llms.txt` file
pub struct LinkListStrategy {
    deps: StrategyDeps,
}

impl LinkListStrategy {
    pub fn new(deps: StrategyDeps) -> Self {
        Self { deps }
    }

    /// Fetches the list and returns its absolute http(s) link targets
    async fn load_links(
        &self,
        cancel: &CancellationToken,
        url: &str,
    ) -> Result<Vec<String>, StrategyError> {
        let response = self
            .deps
            .fetcher
            .get(cancel, url)
            .await
            .map_err(|e| StrategyError::failed(self.name(), url, e))?;

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

        let base = Url::parse(&response.final_url)
            .or_else(|_| Url::parse(url))
            .map_err(|e| StrategyError::InvalidInput {
                strategy: self.name(),
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(markdown_links(&text, &base))
    }
}

#[async_trait]
impl Strategy for LinkListStrategy {
    fn name(&self) -> &'static str {
        StrategyType::LinkList.name()
    }

    fn can_handle(&self, url: &str) -> bool {
        is_link_list(url)
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        url: &str,
        options: &CrawlOptions,
    ) -> Result<CrawlSummary, StrategyError> {
        let links = self.load_links(cancel, url).await?;
        if links.is_empty() {
            tracing::warn!("Link list {} contains no links", url);
            return Ok(CrawlSummary::default());
        }

        tracing::info!("Link list {} contains {} links", url, links.len());
        let options = CrawlOptions {
            max_depth: 0,
            ..options.clone()
        };

        self.deps
            .engine(self.name())
            .run_batch(cancel, &links, &options)
            .await
            .map_err(|e| StrategyError::failed(self.name(), url, e))
    }
}
