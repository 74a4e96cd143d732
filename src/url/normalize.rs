use crate::UrlError;
use url::Url;

/// Click-tracking query keys dropped from canonical URLs (`utm_*` is matched by prefix)
const TRACKING_KEYS: &[&str] = &["fbclid", "gclid", "mc_eid", "msclkid", "_ga"];

/// Normalizes a URL into the canonical form used for deduplication and cache keys
///
/// The host is lowercased and default ports dropped by the parser, which
/// also resolves `.`/`..` segments. On top of that, repeated slashes in the
/// path collapse, the fragment goes, tracking parameters are removed and the
/// remaining query pairs are sorted. An empty query is removed entirely.
///
/// Trailing slashes are kept: `/docs/` and `/docs` resolve relative links
/// differently, so they are distinct documents.
///
/// # Errors
///
/// Unparseable input, a scheme other than http(s), or a missing host.
///
/// # Examples
///
/// ```
/// use doc_harvest::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM//guide/?b=2&a=1#intro").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/guide/?a=1&b=2");
/// ```
pub fn normalize_url(input: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(input.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    let path = collapse_slashes(url.path());
    url.set_path(&path);
    url.set_fragment(None);

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_key(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    pairs.sort();

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    Ok(url)
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() || path.ends_with('/') {
        out.push('/');
    }
    out
}

fn is_tracking_key(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_KEYS.contains(&key)
}
