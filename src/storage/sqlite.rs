//! SQLite-backed cache store

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::error::Result;
use crate::search::cache::CacheStore;

/// Bumped whenever the table layout changes.
pub const SCHEMA_VERSION: u32 = 1;

/// Persistent [`CacheStore`] that survives process restarts.
///
/// Expiry is checked on read; [`SqliteCacheStore::purge_expired`] reclaims
/// the space. Pattern deletes use SQLite `GLOB`, which shares `*`, `?` and
/// `[...]` syntax with the in-memory store.
pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
}

impl SqliteCacheStore {
    /// Open (creating if needed) the cache database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::configure_pragmas(&conn)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                 key TEXT PRIMARY KEY,
                 value TEXT NOT NULL,
                 expires_at INTEGER NOT NULL,
                 updated_at INTEGER NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_cache_entries_expires
                 ON cache_entries(expires_at);",
        )?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn configure_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;",
        )?;
        Ok(())
    }

    #[must_use]
    pub fn schema_version(&self) -> u32 {
        self.conn
            .lock()
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap_or(0)
    }

    /// Delete every expired row. Returns rows removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let removed = self.conn.lock().execute(
            "DELETE FROM cache_entries WHERE expires_at <= ?1",
            params![now_millis()],
        )?;
        debug!(removed, "purged expired cache entries");
        Ok(removed)
    }

    /// Number of rows, expired or not.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn expiry_millis(ttl: Duration) -> i64 {
    let ttl = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_millis().saturating_add(ttl)
}

impl CacheStore for SqliteCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .lock()
            .query_row(
                "SELECT value FROM cache_entries WHERE key = ?1 AND expires_at > ?2",
                params![key, now_millis()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.conn.lock().execute(
            "INSERT INTO cache_entries (key, value, expires_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 expires_at = excluded.expires_at,
                 updated_at = excluded.updated_at",
            params![key, value, expiry_millis(ttl), now_millis()],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.conn
            .lock()
            .execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn delete_by_pattern(&self, pattern: &str) -> Result<usize> {
        let removed = self.conn.lock().execute(
            "DELETE FROM cache_entries WHERE key GLOB ?1",
            params![pattern],
        )?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::tempdir;

    use super::*;
    use crate::matching::ranking::MatchDirection;
    use crate::search::cache::{CacheStats, MatchCache, match_cache_key};
    use crate::search::hybrid::RankedResult;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn creates_database_and_schema_version() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested/cache.db");
        let store = SqliteCacheStore::open(&db_path).unwrap();
        assert!(db_path.exists());
        assert_eq!(store.schema_version(), SCHEMA_VERSION);
    }

    #[test]
    fn set_get_overwrite_delete() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        store.set("k", "v1", HOUR).unwrap();
        store.set("k", "v2", HOUR).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(store.len().unwrap(), 1);

        store.delete("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn expired_rows_are_invisible_then_purged() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        store.set("old", "v", Duration::ZERO).unwrap();
        store.set("new", "v", HOUR).unwrap();

        assert!(store.get("old").unwrap().is_none());
        assert_eq!(store.purge_expired().unwrap(), 1);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn glob_deletes_match_memory_semantics() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        store.set("matches:jobs-for-teacher:t1:a", "v", HOUR).unwrap();
        store.set("matches:teachers-for-job:j1:a", "v", HOUR).unwrap();
        store.set("embedding:teacher:t1", "v", HOUR).unwrap();

        assert_eq!(store.delete_by_pattern("matches:*").unwrap(), 2);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn escaped_ids_only_hit_literal_keys() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        store.set("matches:jobs-for-teacher:t*:a", "v", HOUR).unwrap();
        store.set("matches:jobs-for-teacher:t1:a", "v", HOUR).unwrap();

        let pattern = format!("matches:jobs-for-teacher:{}:*", glob::Pattern::escape("t*"));
        assert_eq!(store.delete_by_pattern(&pattern).unwrap(), 1);
        assert!(store.get("matches:jobs-for-teacher:t1:a").unwrap().is_some());
    }

    #[test]
    fn survives_reopen_behind_match_cache() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let key = match_cache_key(MatchDirection::TeachersForJob, "job-1", "abc");
        let results = vec![RankedResult::new("teacher-1", 90.0)];

        {
            let store = Arc::new(SqliteCacheStore::open(&path).unwrap());
            let cache = MatchCache::new(store, Arc::new(CacheStats::new()), HOUR);
            cache.cache_matches(&key, &results);
        }

        let store = Arc::new(SqliteCacheStore::open(&path).unwrap());
        let cache = MatchCache::new(store, Arc::new(CacheStats::new()), HOUR);
        assert_eq!(cache.get_cached_matches(&key), Some(results));
        assert_eq!(cache.invalidate_match_cache("job-1").unwrap(), 1);
        assert!(cache.get_cached_matches(&key).is_none());
    }
}
