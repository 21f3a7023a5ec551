//! Score fusion: resume similarity, video similarity and constraint pass-rate
//! combined into one 0-100 score.

use serde::{Deserialize, Serialize};

use crate::core::EmbeddingVector;
use crate::error::{MatchError, Result};
use crate::search::similarity::cosine_similarity;

pub const DEFAULT_RESUME_WEIGHT: f64 = 0.5;
pub const DEFAULT_VIDEO_WEIGHT: f64 = 0.3;
pub const DEFAULT_CONSTRAINT_WEIGHT: f64 = 0.2;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Absorbs float noise so values like 22.4999999 still round half-up.
const ROUNDING_NUDGE: f64 = 1e-9;

/// Fusion weights. They must be non-negative and sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub resume: f64,
    pub video: f64,
    pub constraints: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            resume: DEFAULT_RESUME_WEIGHT,
            video: DEFAULT_VIDEO_WEIGHT,
            constraints: DEFAULT_CONSTRAINT_WEIGHT,
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("resume", self.resume),
            ("video", self.video),
            ("constraints", self.constraints),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(MatchError::InvalidWeights(format!(
                    "{name} weight must be a non-negative number, got {value}"
                )));
            }
        }
        let sum = self.resume + self.video + self.constraints;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(MatchError::InvalidWeights(format!(
                "weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// Fused match score. Components are percentages in `[0, 100]`; `overall`
/// is always their weighted combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub resume_match: f64,
    pub video_match: f64,
    pub constraint_match: f64,
    pub overall: u8,
}

impl MatchScore {
    /// Fuse component percentages that were computed elsewhere.
    pub fn from_components(
        resume_match: f64,
        video_match: f64,
        constraint_match: f64,
        weights: &ScoreWeights,
    ) -> Result<Self> {
        weights.validate()?;
        for (name, value) in [
            ("resume_match", resume_match),
            ("video_match", video_match),
            ("constraint_match", constraint_match),
        ] {
            check_percentage(name, value)?;
        }

        let fused = weights.resume * resume_match
            + weights.video * video_match
            + weights.constraints * constraint_match;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let overall = (fused + ROUNDING_NUDGE).round().clamp(0.0, 100.0) as u8;

        Ok(Self {
            resume_match,
            video_match,
            constraint_match,
            overall,
        })
    }
}

fn check_percentage(name: &str, value: f64) -> Result<()> {
    if value.is_nan() || !(0.0..=100.0).contains(&value) {
        return Err(MatchError::InvalidScore(format!(
            "{name} must be within 0-100, got {value}"
        )));
    }
    Ok(())
}

/// Vectors the candidate's signals are compared against.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceVectors {
    pub resume: EmbeddingVector,
    /// Reference for the video signal; the resume reference is used when absent.
    pub video: Option<EmbeddingVector>,
}

impl ReferenceVectors {
    #[must_use]
    pub const fn new(resume: EmbeddingVector) -> Self {
        Self {
            resume,
            video: None,
        }
    }

    #[must_use]
    pub fn with_video(mut self, video: EmbeddingVector) -> Self {
        self.video = Some(video);
        self
    }

    fn video_reference(&self) -> &EmbeddingVector {
        self.video.as_ref().unwrap_or(&self.resume)
    }
}

/// Similarity of `vector` to `reference` as a percentage. Missing vectors
/// and negative similarity score 0.
pub fn similarity_percent(
    vector: Option<&EmbeddingVector>,
    reference: &EmbeddingVector,
) -> Result<f64> {
    let Some(vector) = vector else {
        return Ok(0.0);
    };
    let similarity = cosine_similarity(vector.as_slice(), reference.as_slice())?;
    Ok((f64::from(similarity) * 100.0).clamp(0.0, 100.0))
}

/// Score one candidate.
///
/// Absent resume or video vectors contribute 0 instead of excluding the
/// candidate, so partial profiles still rank, just lower.
pub fn calculate_match_score(
    resume: Option<&EmbeddingVector>,
    video: Option<&EmbeddingVector>,
    reference: &ReferenceVectors,
    constraint_match: f64,
    weights: &ScoreWeights,
) -> Result<MatchScore> {
    let resume_match = similarity_percent(resume, &reference.resume)?;
    let video_match = similarity_percent(video, reference.video_reference())?;
    MatchScore::from_components(resume_match, video_match, constraint_match, weights)
}
