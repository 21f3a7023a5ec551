//! Caching layer for ranked matches and query embeddings.
//!
//! The backing store is a plain key/value contract ([`CacheStore`]) so it can
//! be an in-process LRU, SQLite or a managed service. [`MatchCache`] sits on
//! top and owns:
//! - typed (de)serialization of entries ([`CachePayload`])
//! - key layout and invalidation patterns
//! - hit/miss accounting through an injected [`StatsCollector`]
//!
//! The cache is an optimization only: read and write failures are logged and
//! treated as misses.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::core::StoredEmbedding;
use crate::error::{MatchError, Result};
use crate::matching::ranking::MatchDirection;
use crate::search::hybrid::RankedResult;

/// Default time-to-live for cached rankings.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default number of entries kept by [`MemoryCacheStore`].
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

const MATCH_PREFIX: &str = "matches";
const EMBEDDING_PREFIX: &str = "embedding";

/// Key/value store with per-entry TTL and glob-pattern deletes.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    fn delete(&self, key: &str) -> Result<()>;

    /// Delete every key matching a glob pattern (`*`, `?`, `[...]`).
    /// Returns the number of keys removed.
    fn delete_by_pattern(&self, pattern: &str) -> Result<usize>;
}

struct StoredValue {
    value: String,
    expires_at: Instant,
}

/// In-process LRU store with TTL expiry.
pub struct MemoryCacheStore {
    entries: Mutex<LruCache<String, StoredValue>>,
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl MemoryCacheStore {
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| MatchError::Cache(format!("ttl {ttl:?} overflows")))?;
        self.entries.lock().put(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().pop(key);
        Ok(())
    }

    fn delete_by_pattern(&self, pattern: &str) -> Result<usize> {
        let matcher = glob::Pattern::new(pattern)
            .map_err(|err| MatchError::Cache(format!("invalid pattern {pattern}: {err}")))?;
        let mut entries = self.entries.lock();
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| matcher.matches(key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        Ok(doomed.len())
    }
}

/// Which kind of entry a cache event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Matches,
    Embedding,
}

/// Receives cache events. Injected so each service (and each test) has
/// its own counters.
pub trait StatsCollector: Send + Sync {
    fn record_hit(&self, kind: CacheKind);
    fn record_miss(&self, kind: CacheKind);
    fn record_error(&self, kind: CacheKind);
}

/// Discards every event.
pub struct NoopStats;

impl StatsCollector for NoopStats {
    fn record_hit(&self, _kind: CacheKind) {}
    fn record_miss(&self, _kind: CacheKind) {}
    fn record_error(&self, _kind: CacheKind) {}
}

/// Atomic cache counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    match_hits: AtomicU64,
    match_misses: AtomicU64,
    embedding_hits: AtomicU64,
    embedding_misses: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    pub match_hits: u64,
    pub match_misses: u64,
    pub embedding_hits: u64,
    pub embedding_misses: u64,
    pub errors: u64,
}

impl CacheStatsSnapshot {
    /// Calculate match cache hit rate.
    #[must_use]
    pub fn match_hit_rate(&self) -> f64 {
        hit_rate(self.match_hits, self.match_misses)
    }

    /// Calculate embedding cache hit rate.
    #[must_use]
    pub fn embedding_hit_rate(&self) -> f64 {
        hit_rate(self.embedding_hits, self.embedding_misses)
    }
}

#[allow(clippy::cast_precision_loss)]
fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

impl CacheStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            match_hits: self.match_hits.load(Ordering::Relaxed),
            match_misses: self.match_misses.load(Ordering::Relaxed),
            embedding_hits: self.embedding_hits.load(Ordering::Relaxed),
            embedding_misses: self.embedding_misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.match_hits,
            &self.match_misses,
            &self.embedding_hits,
            &self.embedding_misses,
            &self.errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl StatsCollector for CacheStats {
    fn record_hit(&self, kind: CacheKind) {
        match kind {
            CacheKind::Matches => self.match_hits.fetch_add(1, Ordering::Relaxed),
            CacheKind::Embedding => self.embedding_hits.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn record_miss(&self, kind: CacheKind) {
        match kind {
            CacheKind::Matches => self.match_misses.fetch_add(1, Ordering::Relaxed),
            CacheKind::Embedding => self.embedding_misses.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn record_error(&self, _kind: CacheKind) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Typed cache payloads, one variant per entry kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachePayload {
    Matches {
        results: Vec<RankedResult>,
    },
    Embedding {
        entity_id: String,
        embedding: StoredEmbedding,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: CachePayload,
    pub cached_at: DateTime<Utc>,
}

/// Cache key for one ranking pass.
#[must_use]
pub fn match_cache_key(direction: MatchDirection, entity_id: &str, fingerprint: &str) -> String {
    format!("{MATCH_PREFIX}:{}:{entity_id}:{fingerprint}", direction.as_str())
}

fn embedding_cache_key(entity_id: &str) -> String {
    format!("{EMBEDDING_PREFIX}:{entity_id}")
}

/// Short stable hash of any serializable value, for use in cache keys.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value)?;
    let digest = Sha256::digest(&json);
    Ok(hex::encode(&digest[..8]))
}

/// Typed cache over a [`CacheStore`].
#[derive(Clone)]
pub struct MatchCache {
    store: Arc<dyn CacheStore>,
    stats: Arc<dyn StatsCollector>,
    ttl: Duration,
    enabled: bool,
}

impl MatchCache {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, stats: Arc<dyn StatsCollector>, ttl: Duration) -> Self {
        Self {
            store,
            stats,
            ttl,
            enabled: true,
        }
    }

    /// A cache that never stores anything.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            store: Arc::new(MemoryCacheStore::new(1)),
            stats: Arc::new(NoopStats),
            ttl: Duration::ZERO,
            enabled: false,
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Cached ranking for `key`, if present and fresh.
    pub fn get_cached_matches(&self, key: &str) -> Option<Vec<RankedResult>> {
        let entry = self.read(key, CacheKind::Matches)?;
        if let CachePayload::Matches { results } = entry.payload {
            debug!(key, "match cache hit");
            self.stats.record_hit(CacheKind::Matches);
            Some(results)
        } else {
            self.stats.record_miss(CacheKind::Matches);
            None
        }
    }

    /// Store a ranking under `key` for the configured TTL.
    pub fn cache_matches(&self, key: &str, results: &[RankedResult]) {
        self.write(
            key,
            CachePayload::Matches {
                results: results.to_vec(),
            },
            CacheKind::Matches,
        );
    }

    /// Cached embedding for an entity, only if generated from `source_hash`.
    pub fn get_cached_embedding(
        &self,
        entity_id: &str,
        source_hash: &str,
    ) -> Option<StoredEmbedding> {
        let entry = self.read(&embedding_cache_key(entity_id), CacheKind::Embedding)?;
        match entry.payload {
            CachePayload::Embedding { embedding, .. } if embedding.is_fresh(source_hash) => {
                self.stats.record_hit(CacheKind::Embedding);
                Some(embedding)
            }
            _ => {
                self.stats.record_miss(CacheKind::Embedding);
                None
            }
        }
    }

    pub fn cache_embedding(&self, entity_id: &str, embedding: &StoredEmbedding) {
        self.write(
            &embedding_cache_key(entity_id),
            CachePayload::Embedding {
                entity_id: entity_id.to_string(),
                embedding: embedding.clone(),
            },
            CacheKind::Embedding,
        );
    }

    /// Drop every cached ranking whose query entity is `entity_id`.
    pub fn invalidate_match_cache(&self, entity_id: &str) -> Result<usize> {
        let escaped = glob::Pattern::escape(entity_id);
        let mut removed = 0;
        for direction in [MatchDirection::JobsForTeacher, MatchDirection::TeachersForJob] {
            removed += self.store.delete_by_pattern(&format!(
                "{MATCH_PREFIX}:{}:{escaped}:*",
                direction.as_str()
            ))?;
        }
        info!(entity_id, removed, "invalidated match cache");
        Ok(removed)
    }

    /// Drop every cached ranking in one direction.
    pub fn invalidate_direction(&self, direction: MatchDirection) -> Result<usize> {
        let removed = self
            .store
            .delete_by_pattern(&format!("{MATCH_PREFIX}:{}:*", direction.as_str()))?;
        info!(direction = direction.as_str(), removed, "invalidated match cache direction");
        Ok(removed)
    }

    /// Drop every cached ranking.
    pub fn invalidate_all_match_caches(&self) -> Result<usize> {
        let removed = self.store.delete_by_pattern(&format!("{MATCH_PREFIX}:*"))?;
        info!(removed, "invalidated all match caches");
        Ok(removed)
    }

    fn read(&self, key: &str, kind: CacheKind) -> Option<CacheEntry> {
        if !self.enabled {
            return None;
        }
        match self.store.get(key) {
            Ok(Some(raw)) => match serde_json::from_str::<CacheEntry>(&raw) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(key, error = %err, "discarding unreadable cache entry");
                    self.stats.record_error(kind);
                    self.stats.record_miss(kind);
                    if let Err(err) = self.store.delete(key) {
                        debug!(key, error = %err, "failed to delete unreadable cache entry");
                    }
                    None
                }
            },
            Ok(None) => {
                self.stats.record_miss(kind);
                None
            }
            Err(err) => {
                warn!(key, error = %err, "cache read failed, treating as miss");
                self.stats.record_error(kind);
                self.stats.record_miss(kind);
                None
            }
        }
    }

    fn write(&self, key: &str, payload: CachePayload, kind: CacheKind) {
        if !self.enabled {
            return;
        }
        let entry = CacheEntry {
            payload,
            cached_at: Utc::now(),
        };
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key, error = %err, "failed to serialize cache entry");
                self.stats.record_error(kind);
                return;
            }
        };
        if let Err(err) = self.store.set(key, &raw, self.ttl) {
            warn!(key, error = %err, "cache write failed");
            self.stats.record_error(kind);
        }
    }
}
