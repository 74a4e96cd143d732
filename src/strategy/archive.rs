use crate::crawler::{CrawlOptions, CrawlSummary};
use crate::strategy::detect::is_source_archive;
use crate::strategy::{Strategy, StrategyDeps, StrategyError, StrategyType};
use crate::url::is_ssh_remote;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Revision the README is read from
const REVISION: &str = "HEAD";

/// File fetched from the repository root
const README: &str = "README.md";

/// Splits a repository input into its lowercase host and path
fn host_and_path(input: &str) -> Option<(String, String)> {
    if is_ssh_remote(input) {
        let (_, rest) = input.split_once('@')?;
        let (host, path) = rest.split_once(':')?;
        return Some((host.to_ascii_lowercase(), path.to_string()));
    }

    let url = Url::parse(input).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    Some((host, url.path().to_string()))
}

/// Maps a repository input to the raw URL of its root README
///
/// GitHub, GitLab (including subgroups) and Bitbucket are supported, in
/// https or SSH form, with or without a `.git` suffix.
///
/// # Examples
///
/// ```
/// use doc_harvest::strategy::readme_url;
///
/// assert_eq!(
///     readme_url("git@github.com:owner/repo.git").unwrap(),
///     "https://raw.githubusercontent.com/owner/repo/HEAD/README.md"
/// );
/// ```
pub fn readme_url(input: &str) -> Result<String, StrategyError> {
    let input = input.trim();
    let invalid = |reason: &str| StrategyError::InvalidInput {
        strategy: StrategyType::SourceArchive.name(),
        url: input.to_string(),
        reason: reason.to_string(),
    };

    let (host, path) = host_and_path(input).ok_or_else(|| invalid("not a repository URL"))?;
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match host {
        "github.com" => {
            let (owner, repo) =
                owner_and_repo(&segments).ok_or_else(|| invalid("missing owner or repository"))?;
            Ok(format!(
                "https://raw.githubusercontent.com/{}/{}/{}/{}",
                owner, repo, REVISION, README
            ))
        }
        "bitbucket.org" => {
            let (owner, repo) =
                owner_and_repo(&segments).ok_or_else(|| invalid("missing owner or repository"))?;
            Ok(format!(
                "https://bitbucket.org/{}/{}/raw/{}/{}",
                owner, repo, REVISION, README
            ))
        }
        "gitlab.com" => {
            // Project paths may nest subgroups; `/-/` starts the route suffix
            let project: Vec<&str> = segments
                .iter()
                .take_while(|s| **s != "-")
                .copied()
                .collect();
            let (last, groups) = project
                .split_last()
                .filter(|(_, groups)| !groups.is_empty())
                .ok_or_else(|| invalid("missing group or project"))?;
            Ok(format!(
                "https://gitlab.com/{}/{}/-/raw/{}/{}",
                groups.join("/"),
                strip_git_suffix(last),
                REVISION,
                README
            ))
        }
        _ => Err(invalid("unsupported repository host")),
    }
}

fn owner_and_repo<'a>(segments: &[&'a str]) -> Option<(&'a str, &'a str)> {
    match segments {
        [owner, repo, ..] => {
            let repo = strip_git_suffix(*repo);
            (!repo.is_empty()).then_some((*owner, repo))
        }
        _ => None,
    }
}

fn strip_git_suffix(name: &str) -> &str {
    name.strip_suffix(".git").unwrap_or(name)
}

/// Repository README fetched as raw Markdown
pub struct SourceArchiveStrategy {
    deps: StrategyDeps,
}

impl SourceArchiveStrategy {
    pub fn new(deps: StrategyDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Strategy for SourceArchiveStrategy {
    fn name(&self) -> &'static str {
        StrategyType::SourceArchive.name()
    }

    fn can_handle(&self, url: &str) -> bool {
        is_source_archive(url)
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        url: &str,
        options: &CrawlOptions,
    ) -> Result<CrawlSummary, StrategyError> {
        let readme = readme_url(url)?;
        tracing::info!("Fetching repository README from {}", readme);

        let options = CrawlOptions {
            max_depth: 0,
            filter_url: None,
            ..options.clone()
        };

        self.deps
            .engine(self.name())
            .run(cancel, &readme, &options)
            .await
            .map_err(|e| StrategyError::failed(self.name(), url, e))
    }
}
