use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};
use crate::matching::ranking::DEFAULT_TOP_N;
use crate::matching::score::{
    DEFAULT_CONSTRAINT_WEIGHT, DEFAULT_RESUME_WEIGHT, DEFAULT_VIDEO_WEIGHT, ScoreWeights,
};
use crate::search::batch::{DEFAULT_BATCH_DELAY, DEFAULT_BATCH_SIZE};
use crate::search::cache::{DEFAULT_CACHE_TTL, DEFAULT_MAX_ENTRIES};
use crate::search::hybrid::DEFAULT_RRF_K;

const PROJECT_CONFIG: &str = "nexus-match.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Defaults, then the global and project files (or only `explicit_path`
    /// / `NEXUS_CONFIG` when given), then `NEXUS_*` environment overrides.
    pub fn load(explicit_path: Option<&Path>, project_root: &Path) -> Result<Self> {
        Self::load_with_env(explicit_path, project_root, &|key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`] with an injectable environment lookup.
    pub fn load_with_env(
        explicit_path: Option<&Path>,
        project_root: &Path,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| lookup("NEXUS_CONFIG").map(PathBuf::from));

        if let Some(path) = explicit {
            let patch = Self::load_patch(&path)?.ok_or_else(|| {
                MatchError::MissingConfig(format!("config file {} not found", path.display()))
            })?;
            config.merge_patch(patch);
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_patch(&project_root.join(PROJECT_CONFIG))? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides(&Env { lookup })?;
        config.validate()?;
        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("nexus-match/config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| MatchError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| MatchError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.embedding {
            self.embedding.merge(patch);
        }
        if let Some(patch) = patch.scoring {
            self.scoring.merge(patch);
        }
        if let Some(patch) = patch.ranking {
            self.ranking.merge(patch);
        }
        if let Some(patch) = patch.cache {
            self.cache.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self, env: &Env<'_>) -> Result<()> {
        if let Some(value) = env.string("NEXUS_EMBEDDING_BACKEND") {
            self.embedding.backend = value;
        }
        if let Some(value) = env.string("NEXUS_EMBEDDING_MODEL") {
            self.embedding.model = value;
        }
        if let Some(value) = env.string("NEXUS_EMBEDDING_BASE_URL") {
            self.embedding.base_url = value;
        }
        if let Some(value) = env.string("NEXUS_EMBEDDING_API_KEY_ENV") {
            self.embedding.api_key_env = Some(value);
        }
        if let Some(value) = env.parse::<usize>("NEXUS_EMBEDDING_DIMS")? {
            self.embedding.dims = value;
        }
        if let Some(value) = env.duration("NEXUS_EMBEDDING_TIMEOUT")? {
            self.embedding.timeout = Some(value);
        }
        if let Some(value) = env.parse::<usize>("NEXUS_EMBEDDING_BATCH_SIZE")? {
            self.embedding.batch_size = value;
        }
        if let Some(value) = env.duration("NEXUS_EMBEDDING_BATCH_DELAY")? {
            self.embedding.batch_delay = value;
        }

        if let Some(value) = env.parse::<f64>("NEXUS_SCORING_RESUME_WEIGHT")? {
            self.scoring.resume_weight = value;
        }
        if let Some(value) = env.parse::<f64>("NEXUS_SCORING_VIDEO_WEIGHT")? {
            self.scoring.video_weight = value;
        }
        if let Some(value) = env.parse::<f64>("NEXUS_SCORING_CONSTRAINT_WEIGHT")? {
            self.scoring.constraint_weight = value;
        }

        if let Some(value) = env.parse::<usize>("NEXUS_RANKING_TOP_N")? {
            self.ranking.top_n = value;
        }
        if let Some(value) = env.parse::<f64>("NEXUS_RANKING_MIN_SIMILARITY")? {
            self.ranking.min_similarity = value;
        }
        if let Some(value) = env.parse::<f64>("NEXUS_RANKING_RRF_K")? {
            self.ranking.rrf_k = value;
        }

        if let Some(value) = env.bool("NEXUS_CACHE_ENABLED") {
            self.cache.enabled = value;
        }
        if env.bool("NEXUS_CACHE_DISABLED").unwrap_or(false) {
            self.cache.enabled = false;
        }
        if let Some(value) = env.string("NEXUS_CACHE_BACKEND") {
            self.cache.backend = value;
        }
        if let Some(value) = env.string("NEXUS_CACHE_PATH") {
            self.cache.path = Some(PathBuf::from(value));
        }
        if let Some(value) = env.duration("NEXUS_CACHE_TTL")? {
            self.cache.ttl = value;
        }
        if let Some(value) = env.parse::<usize>("NEXUS_CACHE_MAX_ENTRIES")? {
            self.cache.max_entries = value;
        }

        Ok(())
    }

    /// Reject settings that would fail later in a less obvious way.
    pub fn validate(&self) -> Result<()> {
        self.scoring.weights().validate()?;

        if !matches!(self.embedding.backend.as_str(), "hash" | "api" | "openai") {
            return Err(MatchError::Config(format!(
                "unknown embedding backend {} (expected hash|api)",
                self.embedding.backend
            )));
        }
        if self.embedding.dims == 0 {
            return Err(MatchError::Config("embedding.dims must be positive".to_string()));
        }
        if self.embedding.batch_size == 0 {
            return Err(MatchError::Config(
                "embedding.batch_size must be positive".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.ranking.min_similarity) {
            return Err(MatchError::Config(format!(
                "ranking.min_similarity must be within 0-100, got {}",
                self.ranking.min_similarity
            )));
        }
        if !self.ranking.rrf_k.is_finite() || self.ranking.rrf_k < 0.0 {
            return Err(MatchError::Config(format!(
                "ranking.rrf_k must be a non-negative number, got {}",
                self.ranking.rrf_k
            )));
        }
        if !matches!(self.cache.backend.as_str(), "memory" | "sqlite") {
            return Err(MatchError::Config(format!(
                "unknown cache backend {} (expected memory|sqlite)",
                self.cache.backend
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `hash` (offline, deterministic) or `api` (OpenAI-compatible HTTP)
    pub backend: String,
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: Option<String>,
    pub dims: usize,
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
    pub batch_size: usize,
    #[serde(with = "humantime_serde")]
    pub batch_delay: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "hash".to_string(),
            model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com".to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            dims: 384,
            timeout: Some(Duration::from_secs(30)),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }
}

impl EmbeddingConfig {
    fn merge(&mut self, patch: EmbeddingPatch) {
        if let Some(value) = patch.backend {
            self.backend = value;
        }
        if let Some(value) = patch.model {
            self.model = value;
        }
        if let Some(value) = patch.base_url {
            self.base_url = value;
        }
        if let Some(value) = patch.api_key_env {
            self.api_key_env = Some(value);
        }
        if let Some(value) = patch.dims {
            self.dims = value;
        }
        if let Some(value) = patch.timeout {
            self.timeout = Some(value);
        }
        if let Some(value) = patch.batch_size {
            self.batch_size = value;
        }
        if let Some(value) = patch.batch_delay {
            self.batch_delay = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub resume_weight: f64,
    pub video_weight: f64,
    pub constraint_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            resume_weight: DEFAULT_RESUME_WEIGHT,
            video_weight: DEFAULT_VIDEO_WEIGHT,
            constraint_weight: DEFAULT_CONSTRAINT_WEIGHT,
        }
    }
}

impl ScoringConfig {
    #[must_use]
    pub const fn weights(&self) -> ScoreWeights {
        ScoreWeights {
            resume: self.resume_weight,
            video: self.video_weight,
            constraints: self.constraint_weight,
        }
    }

    fn merge(&mut self, patch: ScoringPatch) {
        if let Some(value) = patch.resume_weight {
            self.resume_weight = value;
        }
        if let Some(value) = patch.video_weight {
            self.video_weight = value;
        }
        if let Some(value) = patch.constraint_weight {
            self.constraint_weight = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub top_n: usize,
    /// Minimum resume similarity (0-100) a candidate needs to be ranked.
    pub min_similarity: f64,
    pub rrf_k: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            min_similarity: 0.0,
            rrf_k: DEFAULT_RRF_K,
        }
    }
}

impl RankingConfig {
    fn merge(&mut self, patch: RankingPatch) {
        if let Some(value) = patch.top_n {
            self.top_n = value;
        }
        if let Some(value) = patch.min_similarity {
            self.min_similarity = value;
        }
        if let Some(value) = patch.rrf_k {
            self.rrf_k = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// `memory` (per process) or `sqlite` (persistent)
    pub backend: String,
    /// SQLite file; defaults to the user cache directory.
    pub path: Option<PathBuf>,
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: "memory".to_string(),
            path: None,
            ttl: DEFAULT_CACHE_TTL,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl CacheConfig {
    /// Configured SQLite path, else `<cache dir>/nexus-match/cache.db`.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        dirs::cache_dir()
            .map(|dir| dir.join("nexus-match").join("cache.db"))
            .ok_or_else(|| MatchError::MissingConfig("cache directory not found".to_string()))
    }

    fn merge(&mut self, patch: CachePatch) {
        if let Some(value) = patch.enabled {
            self.enabled = value;
        }
        if let Some(value) = patch.backend {
            self.backend = value;
        }
        if let Some(value) = patch.path {
            self.path = Some(value);
        }
        if let Some(value) = patch.ttl {
            self.ttl = value;
        }
        if let Some(value) = patch.max_entries {
            self.max_entries = value;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    embedding: Option<EmbeddingPatch>,
    scoring: Option<ScoringPatch>,
    ranking: Option<RankingPatch>,
    cache: Option<CachePatch>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingPatch {
    backend: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    api_key_env: Option<String>,
    dims: Option<usize>,
    #[serde(default, with = "humantime_serde")]
    timeout: Option<Duration>,
    batch_size: Option<usize>,
    #[serde(default, with = "humantime_serde")]
    batch_delay: Option<Duration>,
}

#[derive(Debug, Default, Deserialize)]
struct ScoringPatch {
    resume_weight: Option<f64>,
    video_weight: Option<f64>,
    constraint_weight: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RankingPatch {
    top_n: Option<usize>,
    min_similarity: Option<f64>,
    rrf_k: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct CachePatch {
    enabled: Option<bool>,
    backend: Option<String>,
    path: Option<PathBuf>,
    #[serde(default, with = "humantime_serde")]
    ttl: Option<Duration>,
    max_entries: Option<usize>,
}

/// Typed access to environment overrides.
struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    fn bool(&self, key: &str) -> Option<bool> {
        self.string(key).map(|value| {
            matches!(
                value.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.string(key) {
            Some(value) => value.trim().parse::<T>().map(Some).map_err(|err| {
                MatchError::Config(format!("invalid {key} value {value}: {err}"))
            }),
            None => Ok(None),
        }
    }

    fn duration(&self, key: &str) -> Result<Option<Duration>> {
        match self.string(key) {
            Some(value) => humantime_serde::re::humantime::parse_duration(value.trim())
                .map(Some)
                .map_err(|err| MatchError::Config(format!("invalid {key} value {value}: {err}"))),
            None => Ok(None),
        }
    }
}
