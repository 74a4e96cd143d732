//! SQLite cache implementation
//!
//! This module provides a SQLite-based implementation of the Cache trait.

use crate::cache::schema::initialize_schema;
use crate::cache::traits::{duration_millis, Cache, CacheEntry, CacheError, CacheResult, CacheStats};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// SQLite cache backend
///
/// A single connection is shared behind a mutex; statements are short and
/// never span an await point.
pub struct SqliteCache {
    conn: Mutex<Option<Connection>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SqliteCache {
    /// Opens or creates a cache database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file; missing parent directories are created
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteCache)` - Successfully opened/created cache
    /// * `Err(CacheError)` - Failed to open the database
    pub fn open(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self::from_connection(conn))
    }

    /// Creates an in-memory cache
    pub fn open_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> CacheResult<T>) -> CacheResult<T> {
        let guard = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(CacheError::Closed),
        }
    }

    /// Reads the raw entry for `key`, deleting it if it has expired
    pub fn get_entry(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        let entry = self.with_conn(|conn| {
            let row: Option<(Vec<u8>, i64)> = conn
                .query_row(
                    "SELECT value, expires_at FROM cache_entries WHERE key = ?1",
                    params![key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let Some((value, expires_at)) = row else {
                return Ok(None);
            };

            let entry = CacheEntry::from_millis(value, expires_at)?;
            if entry.is_expired() {
                conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
                return Ok(None);
            }

            Ok(Some(entry))
        })?;

        let counter = if entry.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);

        Ok(entry)
    }

    /// Deletes every expired row, returning how many were removed
    pub fn purge_expired(&self) -> CacheResult<usize> {
        let now = Utc::now().timestamp_millis();
        self.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM cache_entries WHERE expires_at <= ?1",
                params![now],
            )?)
        })
    }
}

impl Cache for SqliteCache {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(self.get_entry(key)?.map(|entry| entry.value))
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let now = Utc::now().timestamp_millis();
        let expires_at = now.saturating_add(duration_millis(ttl));

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO cache_entries (key, value, expires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    expires_at = excluded.expires_at,
                    created_at = excluded.created_at",
                params![key, value, expires_at, now],
            )?;
            Ok(())
        })
    }

    fn has(&self, key: &str) -> CacheResult<bool> {
        let now = Utc::now().timestamp_millis();
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM cache_entries WHERE key = ?1 AND expires_at > ?2",
                    params![key, now],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
            Ok(())
        })
    }

    fn clear(&self) -> CacheResult<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM cache_entries", [])?;
            Ok(())
        })
    }

    fn stats(&self) -> CacheResult<CacheStats> {
        let now = Utc::now().timestamp_millis();
        let (entries, expired, total_bytes) = self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(CASE WHEN expires_at <= ?1 THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(LENGTH(value)), 0)
                 FROM cache_entries",
                params![now],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )?)
        })?;

        Ok(CacheStats {
            entries: entries.max(0) as u64,
            expired: expired.max(0) as u64,
            total_bytes: total_bytes.max(0) as u64,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        })
    }

    fn close(&self) -> CacheResult<()> {
        let mut guard = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| CacheError::Sqlite(e))?;
        }
        Ok(())
    }
}
