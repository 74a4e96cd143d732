//! Response cache for doc-harvest
//!
//! Fetched responses are stored as opaque byte blobs with a per-entry TTL.
//! Keys are SHA-256 digests of normalized URLs, so every spelling of the
//! same page shares one entry.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteCache;
pub use traits::{Cache, CacheEntry, CacheError, CacheResult, CacheStats};

use sha2::{Digest, Sha256};
use std::path::Path;
use url::Url;

/// Opens or creates the cache database at `path`
pub fn open_cache(path: &Path) -> CacheResult<SqliteCache> {
    SqliteCache::open(path)
}

/// Computes the cache key for an already-normalized URL
///
/// The key is the 64-character lowercase hex SHA-256 digest of the URL text.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use doc_harvest::cache::cache_key;
///
/// let url = Url::parse("https://example.com/docs").unwrap();
/// let key = cache_key(&url);
/// assert_eq!(key.len(), 64);
/// assert_eq!(key, cache_key(&url));
/// ```
pub fn cache_key(url: &Url) -> String {
    hex::encode(Sha256::digest(url.as_str().as_bytes()))
}
