//! Embedding providers
//!
//! Two backends sit behind [`EmbeddingProvider`]:
//! - [`HashEmbedder`]: FNV-1a feature hashing. No model, fully deterministic,
//!   used offline and in tests.
//! - [`ApiEmbedder`]: OpenAI-compatible `/v1/embeddings` endpoint.
//!
//! Records are flattened into a labelled text block before embedding; the
//! SHA-256 of that block is stored next to the vector so a changed record
//! can be detected and re-embedded.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::EmbeddingConfig;
use crate::core::{EmbeddingVector, JobPosting, TeacherProfile};
use crate::error::{MatchError, Result};

/// Turns text into fixed-length vectors.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text block.
    fn embed(&self, text: &str) -> Result<EmbeddingVector>;

    /// Length of every vector this provider returns.
    fn dims(&self) -> usize;

    /// Model identifier recorded with stored embeddings.
    fn model(&self) -> &str;
}

/// Flatten a job posting into the text block that gets embedded.
#[must_use]
pub fn job_embedding_text(job: &JobPosting) -> String {
    let mut lines = vec![format!("Position: {}", job.title)];
    push_line(&mut lines, "School", &job.school_name);
    let location = [job.city.as_str(), job.country.as_str()]
        .iter()
        .filter(|part| !part.trim().is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    push_line(&mut lines, "Location", &location);
    push_line(&mut lines, "Subjects", &job.subjects.join(", "));
    if let Some(requirements) = &job.requirements {
        push_line(&mut lines, "Requirements", requirements);
    }
    push_line(&mut lines, "Description", &job.description);
    lines.join("\n")
}

/// Flatten a teacher profile into the text block that gets embedded.
#[must_use]
pub fn teacher_embedding_text(teacher: &TeacherProfile) -> String {
    let mut lines = vec![format!("Name: {}", teacher.name)];
    if let Some(citizenship) = &teacher.citizenship {
        push_line(&mut lines, "Citizenship", citizenship);
    }
    if let Some(years) = teacher.years_experience {
        lines.push(format!("Experience: {years} years"));
    }
    push_line(&mut lines, "Subjects", &teacher.subjects.join(", "));
    push_line(&mut lines, "Certifications", &teacher.certifications.join(", "));
    push_line(
        &mut lines,
        "Preferred countries",
        &teacher.preferred_countries.join(", "),
    );
    if let Some(summary) = &teacher.summary {
        push_line(&mut lines, "Summary", summary);
    }
    lines.join("\n")
}

fn push_line(lines: &mut Vec<String>, label: &str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        lines.push(format!("{label}: {value}"));
    }
}

/// Hex SHA-256 of a flattened record.
#[must_use]
pub fn source_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Hash embedder using FNV-1a
pub struct HashEmbedder {
    /// Embedding dimension (default: 384)
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dim: 384 }
    }
}

impl HashEmbedder {
    /// Create embedder with specified dimension
    #[must_use]
    pub const fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn add_feature(&self, values: &mut [f32], feature: &str) {
        let hash = fnv1a(feature.as_bytes());
        #[allow(clippy::cast_possible_truncation)]
        let idx = (hash % self.dim as u64) as usize;
        let sign = if hash >> 63 == 1 { -1.0 } else { 1.0 };
        values[idx] += sign;
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        if self.dim == 0 {
            return Ok(EmbeddingVector::new(Vec::new()));
        }

        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
            .collect();

        let mut values = vec![0.0f32; self.dim];
        for token in &tokens {
            self.add_feature(&mut values, token);
        }
        for pair in tokens.windows(2) {
            self.add_feature(&mut values, &format!("{} {}", pair[0], pair[1]));
        }

        let norm = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut values {
                *value /= norm;
            }
        }
        Ok(EmbeddingVector::new(values))
    }

    fn dims(&self) -> usize {
        self.dim
    }

    fn model(&self) -> &str {
        "fnv1a-hash"
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible embeddings endpoint.
pub struct ApiEmbedder {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dims: usize,
}

impl ApiEmbedder {
    /// Build a client. `timeout` is the caller's choice; `None` leaves the
    /// HTTP client's default in place.
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        dims: usize,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| MatchError::Config(format!("embedding http client: {err}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/v1/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
            dims,
        })
    }
}

impl EmbeddingProvider for ApiEmbedder {
    fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };
        let mut call = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }

        let response = call.send().map_err(|err| {
            if err.is_timeout() {
                MatchError::EmbeddingProvider(format!("request timed out: {err}"))
            } else {
                MatchError::EmbeddingProvider(format!("request failed: {err}"))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(MatchError::EmbeddingProvider(format!(
                "HTTP {status}: {body}"
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .map_err(|err| MatchError::EmbeddingProvider(format!("response parse: {err}")))?;

        let embedding = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| MatchError::EmbeddingProvider("empty embedding response".to_string()))?
            .embedding;

        if embedding.len() != self.dims {
            return Err(MatchError::EmbeddingProvider(format!(
                "expected {} dimensions from {}, got {}",
                self.dims,
                self.model,
                embedding.len()
            )));
        }

        Ok(EmbeddingVector::new(embedding))
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Construct the provider selected by configuration.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.backend.as_str() {
        "hash" => Ok(Arc::new(HashEmbedder::new(config.dims))),
        "api" | "openai" => {
            let api_key = config
                .api_key_env
                .as_deref()
                .and_then(|name| std::env::var(name).ok());
            Ok(Arc::new(ApiEmbedder::new(
                &config.base_url,
                &config.model,
                api_key,
                config.dims,
                config.timeout,
            )?))
        }
        other => Err(MatchError::Config(format!(
            "unknown embedding backend {other} (expected hash|api)"
        ))),
    }
}
