//! URL handling module for doc-harvest
//!
//! This module provides URL normalization, input validation, domain
//! extraction, exclusion patterns and link scope policy.

mod domain;
mod matcher;
mod normalize;

use crate::UrlError;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, same_host};
pub use matcher::{ExclusionSet, LinkScope};
pub use normalize::normalize_url;

/// Matches the scp-like SSH form used by git remotes: `user@host:path`
fn ssh_remote_regex() -> &'static Regex {
    static SSH_REMOTE: OnceLock<Regex> = OnceLock::new();
    SSH_REMOTE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._-]+@[A-Za-z0-9.-]+:[A-Za-z0-9._~/-]+$")
            .expect("SSH remote pattern is valid")
    })
}

/// Returns true if the input is an SSH git remote such as `git@github.com:o/r.git`
pub fn is_ssh_remote(input: &str) -> bool {
    ssh_remote_regex().is_match(input.trim())
}

/// Validates a user-supplied source URL before any strategy is built
///
/// Accepts `http`/`https` URLs with a host and SSH git remotes. Everything
/// else is rejected without performing any I/O.
///
/// # Examples
///
/// ```
/// use doc_harvest::url::validate_url;
///
/// assert!(validate_url("https://example.com/docs").is_ok());
/// assert!(validate_url("git@github.com:owner/repo.git").is_ok());
/// assert!(validate_url("ftp://example.com").is_err());
/// assert!(validate_url("").is_err());
/// ```
pub fn validate_url(input: &str) -> Result<(), UrlError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(UrlError::Empty);
    }

    if is_ssh_remote(input) {
        return Ok(());
    }

    let url = Url::parse(input).map_err(|e| UrlError::Parse(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    Ok(())
}
