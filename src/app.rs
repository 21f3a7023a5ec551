use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::Result;
use crate::matching::corpus::CorpusSource;
use crate::matching::service::MatchService;
use crate::search::cache::{CacheStats, CacheStore, MatchCache, MemoryCacheStore};
use crate::search::embeddings::{EmbeddingProvider, build_embedder};
use crate::storage::SqliteCacheStore;

/// Everything a command needs, built once from CLI flags and config.
pub struct AppContext {
    pub project_root: PathBuf,
    pub config: Config,
    pub robot_mode: bool,
    pub verbosity: u8,
    pub stats: Arc<CacheStats>,
    cache: CacheBackend,
}

enum CacheBackend {
    Disabled,
    Memory(Arc<MemoryCacheStore>),
    Sqlite(Arc<SqliteCacheStore>),
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let project_root = std::env::current_dir()?;
        let config = Config::load(cli.config.as_deref(), &project_root)?;
        let mut ctx = Self::from_config(config)?;
        ctx.project_root = project_root;
        ctx.robot_mode = cli.robot;
        ctx.verbosity = cli.verbose;
        Ok(ctx)
    }

    /// Build a context from an already loaded configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        let cache = if !config.cache.enabled {
            CacheBackend::Disabled
        } else if config.cache.backend == "sqlite" {
            let path = config.cache.resolved_path()?;
            CacheBackend::Sqlite(Arc::new(SqliteCacheStore::open(path)?))
        } else {
            CacheBackend::Memory(Arc::new(MemoryCacheStore::new(config.cache.max_entries)))
        };

        Ok(Self {
            project_root: PathBuf::from("."),
            config,
            robot_mode: false,
            verbosity: 0,
            stats: Arc::new(CacheStats::new()),
            cache,
        })
    }

    /// Typed match cache over the configured store.
    #[must_use]
    pub fn match_cache(&self) -> MatchCache {
        let store: Arc<dyn CacheStore> = match &self.cache {
            CacheBackend::Disabled => return MatchCache::disabled(),
            CacheBackend::Memory(store) => store.clone(),
            CacheBackend::Sqlite(store) => store.clone(),
        };
        MatchCache::new(store, self.stats.clone(), self.config.cache.ttl)
    }

    /// The persistent store, when the sqlite backend is active.
    #[must_use]
    pub fn sqlite_store(&self) -> Option<&SqliteCacheStore> {
        match &self.cache {
            CacheBackend::Sqlite(store) => Some(store.as_ref()),
            _ => None,
        }
    }

    #[must_use]
    pub fn memory_store(&self) -> Option<&MemoryCacheStore> {
        match &self.cache {
            CacheBackend::Memory(store) => Some(store.as_ref()),
            _ => None,
        }
    }

    pub fn provider(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        build_embedder(&self.config.embedding)
    }

    /// Match service over `corpus` with configured weights.
    pub fn service(&self, corpus: Arc<dyn CorpusSource>) -> Result<MatchService> {
        MatchService::new(self.provider()?, corpus, self.match_cache())
            .with_weights(self.config.scoring.weights())
    }
}
