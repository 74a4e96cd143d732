//! Fetch error taxonomy and retry classification

use crate::cache::CacheError;
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

/// HTTP status codes worth another attempt
const RETRYABLE_STATUS_CODES: &[u16] = &[429, 502, 503, 504];

/// Errors produced by a [`Fetcher`](crate::fetch::Fetcher)
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Rate limited by {url}")]
    RateLimited {
        url: String,
        retry_after: Option<Duration>,
    },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("HTTP {status} from {url}")]
    Status {
        url: String,
        status: u16,
        retry_after: Option<Duration>,
    },

    #[error("Transient failure fetching {url}: {source}")]
    Retryable {
        url: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Fetch cancelled")]
    Cancelled,

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl FetchError {
    /// Maps a non-success HTTP status to an error
    ///
    /// 429 becomes [`FetchError::RateLimited`]; everything else is a
    /// [`FetchError::Status`].
    pub fn from_status(url: &str, status: u16, retry_after: Option<Duration>) -> Self {
        if status == 429 {
            Self::RateLimited {
                url: url.to_string(),
                retry_after,
            }
        } else {
            Self::Status {
                url: url.to_string(),
                status,
                retry_after,
            }
        }
    }

    /// Classifies a reqwest error raised while talking to `url`
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if err.is_body() {
            // connection dropped mid-body
            Self::Retryable {
                url: url.to_string(),
                source: Box::new(err),
            }
        } else {
            Self::Request {
                url: url.to_string(),
                source: err,
            }
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Returns true if the status code is transient
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUS_CODES.contains(&status) || (520..=530).contains(&status)
}

/// Iterates an error and every cause behind it
fn chain<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |&e| e.source())
}

/// Returns true if the error, or anything in its `source()` chain, is transient
///
/// Transient means a rate limit, a timeout, an explicit
/// [`FetchError::Retryable`] wrapper, or a status in the retryable set.
pub fn is_retryable(err: &(dyn StdError + 'static)) -> bool {
    chain(err).any(|e| {
        if let Some(fetch_err) = e.downcast_ref::<FetchError>() {
            return match fetch_err {
                FetchError::RateLimited { .. }
                | FetchError::Timeout { .. }
                | FetchError::Retryable { .. } => true,
                FetchError::Status { status, .. } => is_retryable_status(*status),
                _ => false,
            };
        }
        e.downcast_ref::<reqwest::Error>()
            .is_some_and(reqwest::Error::is_timeout)
    })
}

/// Returns the first server-supplied retry hint found in the error chain
pub fn retry_after(err: &(dyn StdError + 'static)) -> Option<Duration> {
    chain(err).find_map(|e| match e.downcast_ref::<FetchError>()? {
        FetchError::RateLimited { retry_after, .. } | FetchError::Status { retry_after, .. } => {
            *retry_after
        }
        _ => None,
    })
}

/// Parses a `Retry-After` header holding a non-negative integer of seconds
///
/// HTTP-date values are not supported and yield `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HarvestError;

    fn status(code: u16) -> FetchError {
        FetchError::Status {
            url: "https://example.com/".to_string(),
            status: code,
            retry_after: None,
        }
    }

    #[test]
    fn test_retryable_status_codes() {
        for code in [429, 502, 503, 504, 520, 525, 530] {
            assert!(is_retryable_status(code), "{} should be retryable", code);
        }
        for code in [400, 401, 403, 404, 500, 501, 519, 531] {
            assert!(!is_retryable_status(code), "{} should not be retryable", code);
        }
    }

    #[test]
    fn test_sentinels_are_retryable() {
        let timeout = FetchError::Timeout {
            url: "https://example.com/".to_string(),
        };
        assert!(is_retryable(&timeout));

        let limited = FetchError::from_status("https://example.com/", 429, None);
        assert!(matches!(limited, FetchError::RateLimited { .. }));
        assert!(is_retryable(&limited));

        let wrapped = FetchError::Retryable {
            url: "https://example.com/".to_string(),
            source: "connection reset".into(),
        };
        assert!(is_retryable(&wrapped));
    }

    #[test]
    fn test_permanent_errors_are_not_retryable() {
        assert!(!is_retryable(&status(404)));
        assert!(!is_retryable(&FetchError::Cancelled));
        assert!(!is_retryable(&FetchError::InvalidUrl {
            url: "x".to_string(),
            reason: "bad".to_string(),
        }));
    }

    #[test]
    fn test_classification_walks_source_chain() {
        let wrapped = HarvestError::Fetch(status(503));
        assert!(is_retryable(&wrapped));

        let seed = HarvestError::SeedFailed {
            url: "https://example.com/".to_string(),
            source: Box::new(HarvestError::Fetch(status(502))),
        };
        assert!(is_retryable(&seed));

        let permanent = HarvestError::Fetch(status(410));
        assert!(!is_retryable(&permanent));
    }

    #[test]
    fn test_retry_after_extracted_from_chain() {
        let err = HarvestError::Fetch(FetchError::from_status(
            "https://example.com/",
            429,
            Some(Duration::from_secs(7)),
        ));
        assert_eq!(retry_after(&err), Some(Duration::from_secs(7)));
        assert_eq!(retry_after(&status(503)), None);
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("5"), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(" 0 "), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("-1"), None);
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_status_accessor() {
        assert_eq!(status(404).status(), Some(404));
        assert_eq!(
            FetchError::from_status("https://example.com/", 429, None).status(),
            Some(429)
        );
        assert_eq!(FetchError::Cancelled.status(), None);
    }
}
