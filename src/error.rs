//! Error types for nexus-match.

use thiserror::Error;

/// Message shown to end users when ranking cannot run because the
/// embedding provider is down.
pub const MATCHING_UNAVAILABLE: &str = "matching temporarily unavailable";

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("embedding provider error: {0}")]
    EmbeddingProvider(String),

    #[error("vector dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("invalid score weights: {0}")]
    InvalidWeights(String),

    #[error("invalid score input: {0}")]
    InvalidScore(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("keyword search error: {0}")]
    Search(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl MatchError {
    /// Stable machine-readable code for robot output.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmbeddingProvider(_) => "matching_unavailable",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::InvalidWeights(_) => "invalid_weights",
            Self::InvalidScore(_) => "invalid_score",
            Self::Cache(_) => "cache_error",
            Self::Config(_) | Self::MissingConfig(_) => "config_error",
            Self::NotFound(_) => "not_found",
            Self::Search(_) => "search_error",
            Self::Io(_) | Self::Serialization(_) | Self::Yaml(_) | Self::Database(_) => "error",
        }
    }

    /// Message suitable for end users.
    ///
    /// Provider outages must not read as "no matches", so they map to a
    /// dedicated message instead of the raw upstream error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmbeddingProvider(_) => MATCHING_UNAVAILABLE.to_string(),
            other => other.to_string(),
        }
    }

    /// Operational errors that a caller may retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::EmbeddingProvider(_) | Self::Cache(_))
    }
}

impl From<tantivy::TantivyError> for MatchError {
    fn from(err: tantivy::TantivyError) -> Self {
        Self::Search(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MatchError>;
