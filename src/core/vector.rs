//! Embedding vectors and their stored form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed-length semantic encoding of a job posting or teacher profile.
///
/// There are no mutable accessors: a regenerated embedding replaces the old
/// one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    #[must_use]
    pub const fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    #[must_use]
    pub fn dims(&self) -> usize {
        self.0.len()
    }

    /// Euclidean (L2) norm.
    #[must_use]
    pub fn norm(&self) -> f32 {
        self.0.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|x| *x == 0.0)
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// An embedding as persisted alongside its source entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEmbedding {
    pub vector: EmbeddingVector,
    /// SHA-256 of the flattened text the vector was generated from.
    pub source_hash: String,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

impl StoredEmbedding {
    #[must_use]
    pub fn new(vector: EmbeddingVector, source_hash: String, model: &str) -> Self {
        Self {
            vector,
            source_hash,
            model: model.to_string(),
            generated_at: Utc::now(),
        }
    }

    /// True when the stored vector was produced from text with this hash.
    #[must_use]
    pub fn is_fresh(&self, source_hash: &str) -> bool {
        self.source_hash == source_hash
    }
}
