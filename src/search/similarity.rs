//! Cosine similarity between embeddings.

use crate::error::{MatchError, Result};

/// Cosine similarity in `[-1, 1]`.
///
/// Vectors of unequal length mean two embedding models got mixed upstream,
/// so that is an error rather than a zero. A zero-norm vector yields `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(MatchError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    // Accumulate in f64 and take a single square root so that
    // `cosine_similarity(v, v)` is exactly 1.0.
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    let similarity = dot / (norm_a * norm_b).sqrt();
    if similarity.is_nan() {
        return Ok(0.0);
    }
    #[allow(clippy::cast_possible_truncation)]
    let similarity = similarity.clamp(-1.0, 1.0) as f32;
    Ok(similarity)
}
