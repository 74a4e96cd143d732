use crate::url::domain::same_host;
use regex::Regex;
use url::Url;

/// Compiled set of exclusion patterns
///
/// Patterns that fail to compile are dropped with a debug log; an invalid
/// pattern never aborts a crawl.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    patterns: Vec<Regex>,
}

impl ExclusionSet {
    /// Compiles the given regex patterns, ignoring invalid ones
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| match Regex::new(p.as_ref()) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::debug!("Ignoring invalid exclude pattern {:?}: {}", p.as_ref(), e);
                    None
                }
            })
            .collect();

        Self { patterns }
    }

    /// Returns true if any pattern matches the URL
    pub fn is_excluded(&self, url: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(url))
    }

    /// Number of patterns that compiled successfully
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Policy deciding which discovered links stay inside the crawl
///
/// With an explicit filter URL the check is a plain string prefix match
/// against the filter's parsed form, so scheme and host case or an explicit
/// default port do not matter. The match ignores path boundaries: a filter of `https://example.com/docs`
/// also admits `https://example.com/docs-old`.
#[derive(Debug, Clone)]
pub enum LinkScope {
    /// Links must start with this prefix
    Prefix(String),
    /// Links must share the seed's host and port
    SameHost(Url),
}

impl LinkScope {
    /// Builds the scope for a crawl started at `seed`
    pub fn new(seed: &Url, filter_url: Option<&str>) -> Self {
        match filter_url.map(str::trim).filter(|f| !f.is_empty()) {
            Some(prefix) => Self::Prefix(canonical_prefix(prefix)),
            None => Self::SameHost(seed.clone()),
        }
    }

    /// Returns true if the URL is inside the scope
    pub fn allows(&self, url: &Url) -> bool {
        match self {
            Self::Prefix(prefix) => url.as_str().starts_with(prefix.as_str()),
            Self::SameHost(seed) => same_host(seed, url),
        }
    }
}

/// Serializes the filter the way discovered links are serialized
///
/// Falls back to the raw string when it does not parse.
fn canonical_prefix(filter: &str) -> String {
    match Url::parse(filter) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => filter.to_string(),
    }
}
