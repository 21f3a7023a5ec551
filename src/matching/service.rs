//! Match service: ranking with caching, invalidation and hybrid search.
//!
//! Wires the pure pieces together:
//! reference embedding → corpus → constraints → fused scores → ranked, cached
//! results. The provider, corpus and cache store are injected.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::core::{EmbeddingVector, JobPosting, StoredEmbedding, TeacherProfile};
use crate::error::Result;
use crate::matching::constraints::{ConstraintEvaluator, ConstraintReport};
use crate::matching::corpus::{CorpusSource, MatchFilters};
use crate::matching::ranking::{Candidate, MatchDirection, MatchQuery, RankOptions, rank_candidates};
use crate::matching::score::{MatchScore, ReferenceVectors, ScoreWeights, calculate_match_score};
use crate::search::cache::{MatchCache, fingerprint, match_cache_key};
use crate::search::embeddings::{
    EmbeddingProvider, job_embedding_text, source_hash, teacher_embedding_text,
};
use crate::search::hybrid::{RankedResult, reciprocal_rank_fusion};
use crate::search::keyword::{KeywordDoc, KeywordIndex};

/// The record whose matches are requested.
#[derive(Debug, Clone, Copy)]
pub enum MatchSubject<'a> {
    /// Rank job postings for this teacher.
    Teacher(&'a TeacherProfile),
    /// Rank teachers for this job posting.
    Job(&'a JobPosting),
}

impl MatchSubject<'_> {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Teacher(teacher) => &teacher.id,
            Self::Job(job) => &job.id,
        }
    }

    #[must_use]
    pub const fn direction(&self) -> MatchDirection {
        match self {
            Self::Teacher(_) => MatchDirection::JobsForTeacher,
            Self::Job(_) => MatchDirection::TeachersForJob,
        }
    }

    fn embedding_text(&self) -> String {
        match self {
            Self::Teacher(teacher) => teacher_embedding_text(teacher),
            Self::Job(job) => job_embedding_text(job),
        }
    }

    fn stored_embedding(&self) -> Option<&StoredEmbedding> {
        match self {
            Self::Teacher(teacher) => teacher.resume_embedding.as_ref(),
            Self::Job(job) => job.embedding.as_ref(),
        }
    }

    fn cache_entity(&self) -> String {
        match self {
            Self::Teacher(teacher) => format!("teacher:{}", teacher.id),
            Self::Job(job) => format!("job:{}", job.id),
        }
    }
}

/// Upstream changes that make cached rankings stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationEvent {
    JobUpdated(String),
    JobDeleted(String),
    ProfileUpdated(String),
    EmbeddingsRegenerated,
    ScoringChanged,
}

/// Constraint checks and fused score for one teacher and one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairScore {
    pub teacher_id: String,
    pub job_id: String,
    pub constraints: ConstraintReport,
    pub score: MatchScore,
}

#[derive(Serialize)]
struct QueryFingerprint<'a> {
    mode: &'a str,
    source_hash: &'a str,
    model: &'a str,
    filters: &'a MatchFilters,
    options: &'a RankOptions,
    weights: &'a ScoreWeights,
    keywords: Option<&'a str>,
    rrf_k: Option<f64>,
}

pub struct MatchService {
    provider: Arc<dyn EmbeddingProvider>,
    corpus: Arc<dyn CorpusSource>,
    cache: MatchCache,
    evaluator: ConstraintEvaluator,
    weights: ScoreWeights,
}

impl MatchService {
    #[must_use]
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        corpus: Arc<dyn CorpusSource>,
        cache: MatchCache,
    ) -> Self {
        Self {
            provider,
            corpus,
            cache,
            evaluator: ConstraintEvaluator::default(),
            weights: ScoreWeights::default(),
        }
    }

    /// Replace the fusion weights. Invalid weights are rejected up front.
    pub fn with_weights(mut self, weights: ScoreWeights) -> Result<Self> {
        weights.validate()?;
        self.weights = weights;
        Ok(self)
    }

    #[must_use]
    pub fn with_evaluator(mut self, evaluator: ConstraintEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    #[must_use]
    pub const fn cache(&self) -> &MatchCache {
        &self.cache
    }

    #[must_use]
    pub const fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Score a single pair the way a jobs-for-teacher ranking would.
    pub fn score_pair(&self, teacher: &TeacherProfile, job: &JobPosting) -> Result<PairScore> {
        let subject = MatchSubject::Teacher(teacher);
        let text = subject.embedding_text();
        let resume = self.reference_embedding(subject, &text, &source_hash(&text))?;

        let job_subject = MatchSubject::Job(job);
        let job_text = job_subject.embedding_text();
        let job_vector = self.reference_embedding(job_subject, &job_text, &source_hash(&job_text))?;

        let video = teacher.video_embedding.as_ref().map(|e| e.vector.clone());
        let candidate_video = video.as_ref().map(|_| &job_vector);
        let reference = ReferenceVectors { resume, video };

        let constraints = self.evaluator.evaluate(teacher, job);
        let score = calculate_match_score(
            Some(&job_vector),
            candidate_video,
            &reference,
            constraints.constraint_match,
            &self.weights,
        )?;
        Ok(PairScore {
            teacher_id: teacher.id.clone(),
            job_id: job.id.clone(),
            constraints,
            score,
        })
    }

    /// Ranked matches for `subject`, served from cache when possible.
    ///
    /// Embedding provider failures propagate; the caller must not mistake
    /// them for an empty result.
    pub fn rank_candidates(
        &self,
        subject: MatchSubject<'_>,
        filters: &MatchFilters,
        options: &RankOptions,
    ) -> Result<Vec<RankedResult>> {
        let text = subject.embedding_text();
        let hash = source_hash(&text);
        let key = self.cache_key(subject, &hash, filters, options, None)?;
        if let Some(results) = self.cache.get_cached_matches(&key) {
            return Ok(results);
        }

        let (query, candidates, _) = self.prepare(subject, &text, &hash, filters)?;
        let results = rank_candidates(&query, candidates, options, &self.weights)?;
        self.cache.cache_matches(&key, &results);
        Ok(results)
    }

    /// Vector ranking fused with a BM25 keyword ranking over the same
    /// filtered corpus.
    ///
    /// Keyword hits are limited to candidates that survive the vector pass,
    /// so every fused result carries its match score and constraints.
    pub fn hybrid_rank(
        &self,
        subject: MatchSubject<'_>,
        keywords: &str,
        filters: &MatchFilters,
        options: &RankOptions,
        k: f64,
    ) -> Result<Vec<RankedResult>> {
        let text = subject.embedding_text();
        let hash = source_hash(&text);
        let key = self.cache_key(subject, &hash, filters, options, Some((keywords, k)))?;
        if let Some(results) = self.cache.get_cached_matches(&key) {
            return Ok(results);
        }

        let (query, candidates, docs) = self.prepare(subject, &text, &hash, filters)?;
        let unbounded = RankOptions {
            top_n: candidates.len(),
            ..*options
        };
        let semantic = rank_candidates(&query, candidates, &unbounded, &self.weights)?;

        let keyword: Vec<RankedResult> = KeywordIndex::build(&docs)?
            .search(keywords, docs.len())?
            .into_iter()
            .filter(|hit| semantic.iter().any(|s| s.id == hit.id))
            .collect();
        debug!(
            semantic = semantic.len(),
            keyword = keyword.len(),
            "fusing hybrid ranking"
        );

        let mut fused = reciprocal_rank_fusion(&[semantic, keyword], k);
        fused.truncate(options.top_n);
        self.cache.cache_matches(&key, &fused);
        Ok(fused)
    }

    /// Drop every cached ranking whose query entity is `entity_id`.
    pub fn invalidate_match_cache(&self, entity_id: &str) -> Result<usize> {
        self.cache.invalidate_match_cache(entity_id)
    }

    pub fn invalidate_all_match_caches(&self) -> Result<usize> {
        self.cache.invalidate_all_match_caches()
    }

    /// Invalidate whatever `event` makes stale. Returns entries removed.
    pub fn handle_event(&self, event: &InvalidationEvent) -> Result<usize> {
        let removed = match event {
            InvalidationEvent::JobUpdated(id) | InvalidationEvent::JobDeleted(id) => {
                self.cache.invalidate_match_cache(id)?
                    + self
                        .cache
                        .invalidate_direction(MatchDirection::JobsForTeacher)?
            }
            InvalidationEvent::ProfileUpdated(id) => {
                self.cache.invalidate_match_cache(id)?
                    + self
                        .cache
                        .invalidate_direction(MatchDirection::TeachersForJob)?
            }
            InvalidationEvent::EmbeddingsRegenerated | InvalidationEvent::ScoringChanged => {
                self.cache.invalidate_all_match_caches()?
            }
        };
        info!(?event, removed, "handled invalidation event");
        Ok(removed)
    }

    fn cache_key(
        &self,
        subject: MatchSubject<'_>,
        hash: &str,
        filters: &MatchFilters,
        options: &RankOptions,
        hybrid: Option<(&str, f64)>,
    ) -> Result<String> {
        let print = fingerprint(&QueryFingerprint {
            mode: if hybrid.is_some() { "hybrid" } else { "vector" },
            source_hash: hash,
            model: self.provider.model(),
            filters,
            options,
            weights: &self.weights,
            keywords: hybrid.map(|(keywords, _)| keywords),
            rrf_k: hybrid.map(|(_, k)| k),
        })?;
        Ok(match_cache_key(subject.direction(), subject.id(), &print))
    }

    /// Stored and fresh, else embedding cache, else the provider.
    fn reference_embedding(
        &self,
        subject: MatchSubject<'_>,
        text: &str,
        hash: &str,
    ) -> Result<EmbeddingVector> {
        let usable = |stored: &StoredEmbedding| {
            stored.is_fresh(hash) && stored.vector.dims() == self.provider.dims()
        };

        if let Some(stored) = subject.stored_embedding().filter(|s| usable(*s)) {
            return Ok(stored.vector.clone());
        }

        let entity = subject.cache_entity();
        if let Some(cached) = self
            .cache
            .get_cached_embedding(&entity, hash)
            .filter(|s| usable(s))
        {
            debug!(entity, "reference embedding from cache");
            return Ok(cached.vector);
        }

        let vector = self.provider.embed(text)?;
        self.cache.cache_embedding(
            &entity,
            &StoredEmbedding::new(vector.clone(), hash.to_string(), self.provider.model()),
        );
        debug!(entity, "reference embedding generated");
        Ok(vector)
    }

    fn prepare(
        &self,
        subject: MatchSubject<'_>,
        text: &str,
        hash: &str,
        filters: &MatchFilters,
    ) -> Result<(MatchQuery, Vec<Candidate>, Vec<KeywordDoc>)> {
        let resume = self.reference_embedding(subject, text, hash)?;
        match subject {
            MatchSubject::Teacher(teacher) => {
                let video = teacher.video_embedding.as_ref().map(|e| e.vector.clone());
                let has_video = video.is_some();
                let mut reference = ReferenceVectors::new(resume);
                reference.video = video;

                let jobs = self.corpus.jobs(filters)?;
                let docs = jobs
                    .iter()
                    .map(|job| KeywordDoc {
                        created_at: Some(job.created_at),
                        ..KeywordDoc::new(job.id.clone(), job_embedding_text(job))
                    })
                    .collect();
                let candidates = jobs
                    .iter()
                    .map(|job| {
                        let vector = job.embedding.as_ref().map(|e| e.vector.clone());
                        Candidate {
                            id: job.id.clone(),
                            created_at: job.created_at,
                            video_vector: if has_video { vector.clone() } else { None },
                            resume_vector: vector,
                            constraints: self.evaluator.evaluate(teacher, job),
                        }
                    })
                    .collect();
                Ok((self.query(subject, reference), candidates, docs))
            }
            MatchSubject::Job(job) => {
                let reference = ReferenceVectors::new(resume);
                let teachers = self.corpus.teachers(filters)?;
                let docs = teachers
                    .iter()
                    .map(|teacher| KeywordDoc {
                        created_at: Some(teacher.created_at),
                        ..KeywordDoc::new(teacher.id.clone(), teacher_embedding_text(teacher))
                    })
                    .collect();
                let candidates = teachers
                    .iter()
                    .map(|teacher| Candidate {
                        id: teacher.id.clone(),
                        created_at: teacher.created_at,
                        resume_vector: teacher.resume_embedding.as_ref().map(|e| e.vector.clone()),
                        video_vector: teacher.video_embedding.as_ref().map(|e| e.vector.clone()),
                        constraints: self.evaluator.evaluate(teacher, job),
                    })
                    .collect();
                Ok((self.query(subject, reference), candidates, docs))
            }
        }
    }

    fn query(&self, subject: MatchSubject<'_>, reference: ReferenceVectors) -> MatchQuery {
        MatchQuery {
            entity_id: subject.id().to_string(),
            direction: subject.direction(),
            reference,
        }
    }
}
