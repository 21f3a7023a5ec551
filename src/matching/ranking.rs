//! Candidate ranking by fused match score.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::EmbeddingVector;
use crate::error::Result;
use crate::matching::constraints::ConstraintReport;
use crate::matching::score::{MatchScore, ReferenceVectors, ScoreWeights, calculate_match_score};
use crate::search::hybrid::RankedResult;

pub const DEFAULT_TOP_N: usize = 20;

/// Which side of the marketplace is being ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchDirection {
    /// A teacher's query ranks job postings.
    JobsForTeacher,
    /// A job's query ranks teacher profiles.
    TeachersForJob,
}

impl MatchDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JobsForTeacher => "jobs-for-teacher",
            Self::TeachersForJob => "teachers-for-job",
        }
    }
}

/// The entity whose matches are being ranked, with its reference vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchQuery {
    pub entity_id: String,
    pub direction: MatchDirection,
    pub reference: ReferenceVectors,
}

/// One corpus entry prepared for scoring against a [`MatchQuery`].
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub resume_vector: Option<EmbeddingVector>,
    pub video_vector: Option<EmbeddingVector>,
    pub constraints: ConstraintReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankOptions {
    pub top_n: usize,
    /// Floor on the resume-similarity component (0-100), independent of
    /// constraints.
    pub min_similarity: f64,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            min_similarity: 0.0,
        }
    }
}

/// Score, filter, sort and truncate candidates.
///
/// Order is overall score descending, then newest `created_at`, then id, so
/// the same corpus snapshot always ranks the same way.
pub fn rank_candidates(
    query: &MatchQuery,
    candidates: Vec<Candidate>,
    options: &RankOptions,
    weights: &ScoreWeights,
) -> Result<Vec<RankedResult>> {
    weights.validate()?;
    let total = candidates.len();

    let mut scored: Vec<(Candidate, MatchScore)> = Vec::with_capacity(total);
    for candidate in candidates {
        let score = calculate_match_score(
            candidate.resume_vector.as_ref(),
            candidate.video_vector.as_ref(),
            &query.reference,
            candidate.constraints.constraint_match,
            weights,
        )?;
        if score.resume_match < options.min_similarity {
            continue;
        }
        scored.push((candidate, score));
    }

    scored.sort_by(|(a, a_score), (b, b_score)| {
        b_score
            .overall
            .cmp(&a_score.overall)
            .then(b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    scored.truncate(options.top_n);

    debug!(
        entity = %query.entity_id,
        direction = query.direction.as_str(),
        total,
        kept = scored.len(),
        "ranked candidates"
    );

    Ok(scored
        .into_iter()
        .enumerate()
        .map(|(idx, (candidate, score))| RankedResult {
            id: candidate.id,
            rank: idx + 1,
            score: f64::from(score.overall),
            match_score: Some(score),
            constraints: Some(candidate.constraints),
            created_at: Some(candidate.created_at),
        })
        .collect())
}
