use crate::crawler::{CrawlOptions, CrawlSummary};
use crate::strategy::detect::is_package_registry;
use crate::strategy::{Strategy, StrategyDeps, StrategyError, StrategyType};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Content region of a package page
const DEFAULT_SELECTOR: &str = "main";

/// Single package page from the package registry
pub struct PackageRegistryStrategy {
    deps: StrategyDeps,
}

impl PackageRegistryStrategy {
    pub fn new(deps: StrategyDeps) -> Self {
        Self { deps }
    }

    /// Seed only, with the registry selector unless the caller set one
    fn options(options: &CrawlOptions) -> CrawlOptions {
        CrawlOptions {
            max_depth: 0,
            content_selector: options
                .content_selector
                .clone()
                .or_else(|| Some(DEFAULT_SELECTOR.to_string())),
            ..options.clone()
        }
    }
}

#[async_trait]
impl Strategy for PackageRegistryStrategy {
    fn name(&self) -> &'static str {
        StrategyType::PackageRegistry.name()
    }

    fn can_handle(&self, url: &str) -> bool {
        is_package_registry(url)
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        url: &str,
        options: &CrawlOptions,
    ) -> Result<CrawlSummary, StrategyError> {
        self.deps
            .engine(self.name())
            .run(cancel, url, &Self::options(options))
            .await
            .map_err(|e| StrategyError::failed(self.name(), url, e))
    }
}
