//! Cache trait, entry type and error types

use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cache is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed cache entry: {0}")]
    Encoding(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// A cached value together with its expiry time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub value: Vec<u8>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry expiring `ttl` from now
    pub fn new(value: Vec<u8>, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Utc::now() + chrono::Duration::milliseconds(duration_millis(ttl)),
        }
    }

    /// Builds an entry from a stored expiry timestamp in unix milliseconds
    pub(crate) fn from_millis(value: Vec<u8>, expires_at_ms: i64) -> CacheResult<Self> {
        let expires_at = Utc
            .timestamp_millis_opt(expires_at_ms)
            .single()
            .ok_or_else(|| CacheError::Encoding(format!("bad expiry {}", expires_at_ms)))?;
        Ok(Self { value, expires_at })
    }

    /// True once the expiry time has been reached
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Remaining lifetime, zero once expired
    pub fn ttl(&self) -> Duration {
        (self.expires_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Longest TTL honoured; larger values are clamped so expiry arithmetic cannot overflow
const MAX_TTL_MILLIS: i64 = 100 * 365 * 24 * 60 * 60 * 1000;

pub(crate) fn duration_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis())
        .unwrap_or(MAX_TTL_MILLIS)
        .min(MAX_TTL_MILLIS)
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Rows currently stored, expired ones included
    pub entries: u64,
    /// Rows whose expiry has passed but that have not been read since
    pub expired: u64,
    /// Sum of stored value sizes in bytes
    pub total_bytes: u64,
    /// Successful lookups since the cache was opened
    pub hits: u64,
    /// Failed or expired lookups since the cache was opened
    pub misses: u64,
}

/// A TTL-keyed byte-blob store
///
/// Implementations must be safe to share between concurrent fetchers.
pub trait Cache: Send + Sync {
    /// Returns the value for `key` unless it is missing or expired
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Stores `value` under `key` for `ttl`, replacing any previous value
    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Returns true if a non-expired value exists for `key`
    fn has(&self, key: &str) -> CacheResult<bool>;

    /// Removes `key`; removing a missing key is not an error
    fn delete(&self, key: &str) -> CacheResult<()>;

    /// Removes every entry
    fn clear(&self) -> CacheResult<()>;

    fn stats(&self) -> CacheResult<CacheStats>;

    /// Releases the underlying storage; later calls fail with `Closed`
    fn close(&self) -> CacheResult<()>;
}
