use crate::crawler::{CrawlOptions, CrawlSummary};
use crate::strategy::detect::is_wiki;
use crate::strategy::{Strategy, StrategyDeps, StrategyError, StrategyType};
use crate::url::is_ssh_remote;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Content region of a wiki page
const DEFAULT_SELECTOR: &str = "#wiki-body";

/// Depth used when the caller asks for the seed only
const DEFAULT_DEPTH: u32 = 3;

/// Maps a wiki input to the wiki home URL
///
/// Accepts `https://host/owner/repo/wiki`, `https://host/owner/repo.wiki.git`
/// and `git@host:owner/repo.wiki.git`. The result never ends with a slash.
///
/// # Examples
///
/// ```
/// use doc_harvest::strategy::wiki_base_url;
///
/// assert_eq!(
///     wiki_base_url("git@github.com:owner/repo.wiki.git").unwrap(),
///     "https://github.com/owner/repo/wiki"
/// );
/// assert_eq!(
///     wiki_base_url("https://github.com/owner/repo/wiki/").unwrap(),
///     "https://github.com/owner/repo/wiki"
/// );
/// ```
pub fn wiki_base_url(input: &str) -> Result<String, StrategyError> {
    let input = input.trim();
    let invalid = |reason: &str| StrategyError::InvalidInput {
        strategy: StrategyType::Wiki.name(),
        url: input.to_string(),
        reason: reason.to_string(),
    };

    let (origin, path) = if is_ssh_remote(input) {
        let (_, rest) = input
            .split_once('@')
            .ok_or_else(|| invalid("missing user in SSH remote"))?;
        let (host, path) = rest
            .split_once(':')
            .ok_or_else(|| invalid("missing path in SSH remote"))?;
        (format!("https://{}", host.to_ascii_lowercase()), path.to_string())
    } else {
        let url = Url::parse(input).map_err(|e| invalid(&e.to_string()))?;
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        let origin = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        };
        (origin, url.path().to_string())
    };

    let path = path.trim_matches('/');
    let lower = path.to_ascii_lowercase();

    let repo_path = if lower.ends_with(".wiki.git") {
        &path[..path.len() - ".wiki.git".len()]
    } else if lower == "wiki" || lower.ends_with("/wiki") {
        &path[..path.len() - "wiki".len()]
    } else {
        return Err(invalid("not a wiki URL"));
    };

    let repo_path = repo_path.trim_end_matches('/');
    if repo_path.is_empty() {
        Ok(format!("{}/wiki", origin))
    } else {
        Ok(format!("{}/{}/wiki", origin, repo_path))
    }
}

/// Crawl of a repository wiki, restricted to the wiki prefix
pub struct WikiStrategy {
    deps: StrategyDeps,
}

impl WikiStrategy {
    pub fn new(deps: StrategyDeps) -> Self {
        Self { deps }
    }

    fn options(base: &str, options: &CrawlOptions) -> CrawlOptions {
        CrawlOptions {
            max_depth: if options.max_depth == 0 {
                DEFAULT_DEPTH
            } else {
                options.max_depth
            },
            filter_url: options
                .filter_url
                .clone()
                .or_else(|| Some(base.to_string())),
            content_selector: options
                .content_selector
                .clone()
                .or_else(|| Some(DEFAULT_SELECTOR.to_string())),
            ..options.clone()
        }
    }
}

#[async_trait]
impl Strategy for WikiStrategy {
    fn name(&self) -> &'static str {
        StrategyType::Wiki.name()
    }

    fn can_handle(&self, url: &str) -> bool {
        is_wiki(url)
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        url: &str,
        options: &CrawlOptions,
    ) -> Result<CrawlSummary, StrategyError> {
        let base = wiki_base_url(url)?;
        tracing::info!("Crawling wiki at {}", base);

        self.deps
            .engine(self.name())
            .run(cancel, &base, &Self::options(&base, options))
            .await
            .map_err(|e| StrategyError::failed(self.name(), url, e))
    }
}
