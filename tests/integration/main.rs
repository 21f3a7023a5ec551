//! Integration tests: ranking end to end, cache backends and the HTTP embedder.

mod cache_tests;
mod embedder_tests;
mod match_flow_tests;

use std::sync::Arc;
use std::time::Duration;

use nexus_match::core::{EmbeddingVector, JobPosting, StoredEmbedding, TeacherProfile};
use nexus_match::matching::{InMemoryCorpus, MatchService};
use nexus_match::search::embeddings::{job_embedding_text, source_hash, teacher_embedding_text};
use nexus_match::search::{CacheStats, CacheStore, EmbeddingProvider, HashEmbedder, MatchCache};

pub const HOUR: Duration = Duration::from_secs(3600);

/// Hash embedder with three dimensions, so hand-picked vectors line up.
pub fn provider() -> Arc<dyn EmbeddingProvider> {
    Arc::new(HashEmbedder::new(3))
}

pub fn stored(values: &[f32], text: &str) -> StoredEmbedding {
    StoredEmbedding::new(
        EmbeddingVector::new(values.to_vec()),
        source_hash(text),
        "fnv1a-hash",
    )
}

pub fn embed_job(job: &mut JobPosting, values: &[f32]) {
    job.embedding = Some(stored(values, &job_embedding_text(job)));
}

pub fn embed_teacher(teacher: &mut TeacherProfile, values: &[f32]) {
    teacher.resume_embedding = Some(stored(values, &teacher_embedding_text(teacher)));
}

pub fn service_over(
    corpus: &InMemoryCorpus,
    store: Arc<dyn CacheStore>,
    stats: Arc<CacheStats>,
) -> MatchService {
    MatchService::new(
        provider(),
        Arc::new(corpus.clone()),
        MatchCache::new(store, stats, HOUR),
    )
}
