use crate::strategy::StrategyType;
use crate::url::is_ssh_remote;
use url::Url;

/// Version-control hosts whose repositories map to a source archive
pub const VCS_HOSTS: &[&str] = &["github.com", "gitlab.com", "bitbucket.org"];

/// Package registry served by the registry strategy
pub const PACKAGE_REGISTRY_DOMAIN: &str = "pkg.go.dev";

/// An input URL prepared for pattern matching
struct Candidate {
    lower: String,
    url: Option<Url>,
}

impl Candidate {
    fn new(input: &str) -> Self {
        let lower = input.trim().to_ascii_lowercase();
        let url = Url::parse(&lower).ok();
        Self { lower, url }
    }

    /// Lowercased path without trailing slashes, empty when unparseable
    fn path(&self) -> &str {
        self.url
            .as_ref()
            .map_or("", |u| u.path().trim_end_matches('/'))
    }

    fn host(&self) -> Option<&str> {
        self.url
            .as_ref()
            .and_then(Url::host_str)
            .map(|h| h.strip_prefix("www.").unwrap_or(h))
    }

    fn is_wiki(&self) -> bool {
        self.path().ends_with("/wiki") || self.lower.ends_with(".wiki.git")
    }

    fn is_source_archive(&self) -> bool {
        is_ssh_remote(&self.lower)
            || self.lower.ends_with(".git")
            || self.host().map_or(false, |h| VCS_HOSTS.contains(&h))
    }

    fn is_sitemap(&self) -> bool {
        let path = self.path();
        path.contains("sitemap") && (path.ends_with(".xml") || path.ends_with(".xml.gz"))
    }

    fn is_link_list(&self) -> bool {
        self.path().rsplit('/').next() == Some("llms.txt")
    }

    fn is_package_registry(&self) -> bool {
        self.host()
            .map_or(false, |h| h.contains(PACKAGE_REGISTRY_DOMAIN))
    }

    fn is_crawlable(&self) -> bool {
        self.url.as_ref().map_or(false, |u| {
            matches!(u.scheme(), "http" | "https") && u.host_str().map_or(false, |h| !h.is_empty())
        })
    }
}

/// Classifies an input URL into the strategy that should handle it
///
/// Matching is case-insensitive and follows a fixed priority: wiki, source
/// archive, sitemap, link list, package registry, generic crawler. Inputs
/// matching nothing are [`StrategyType::Unknown`].
///
/// # Examples
///
/// ```
/// use doc_harvest::{detect_strategy, StrategyType};
///
/// assert_eq!(detect_strategy("https://github.com/o/r/wiki"), StrategyType::Wiki);
/// assert_eq!(detect_strategy("git@github.com:o/r.git"), StrategyType::SourceArchive);
/// assert_eq!(detect_strategy("https://example.com/sitemap.xml"), StrategyType::Sitemap);
/// assert_eq!(detect_strategy("https://example.com/llms.txt"), StrategyType::LinkList);
/// assert_eq!(detect_strategy("https://pkg.go.dev/net/http"), StrategyType::PackageRegistry);
/// assert_eq!(detect_strategy("https://example.com/docs"), StrategyType::Crawler);
/// assert_eq!(detect_strategy("ftp://example.com"), StrategyType::Unknown);
/// ```
pub fn detect_strategy(input: &str) -> StrategyType {
    let candidate = Candidate::new(input);
    if candidate.lower.is_empty() {
        return StrategyType::Unknown;
    }

    if candidate.is_wiki() {
        StrategyType::Wiki
    } else if candidate.is_source_archive() {
        StrategyType::SourceArchive
    } else if candidate.is_sitemap() {
        StrategyType::Sitemap
    } else if candidate.is_link_list() {
        StrategyType::LinkList
    } else if candidate.is_package_registry() {
        StrategyType::PackageRegistry
    } else if candidate.is_crawlable() {
        StrategyType::Crawler
    } else {
        StrategyType::Unknown
    }
}

/// Wiki inputs: a `/wiki` path or a `.wiki.git` remote
pub fn is_wiki(input: &str) -> bool {
    Candidate::new(input).is_wiki()
}

/// Repository inputs: a known VCS host, a `.git` suffix or an SSH remote
pub fn is_source_archive(input: &str) -> bool {
    Candidate::new(input).is_source_archive()
}

/// Sitemap inputs: `sitemap` in a path ending in `.xml` or `.xml.gz`
pub fn is_sitemap(input: &str) -> bool {
    Candidate::new(input).is_sitemap()
}

/// Link list inputs: a path whose last segment is `llms.txt`
pub fn is_link_list(input: &str) -> bool {
    Candidate::new(input).is_link_list()
}

pub fn is_package_registry(input: &str) -> bool {
    Candidate::new(input).is_package_registry()
}

/// Any http(s) URL with a host
pub fn is_crawlable(input: &str) -> bool {
    Candidate::new(input).is_crawlable()
}
