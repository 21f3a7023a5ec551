//! RRF (Reciprocal Rank Fusion) for hybrid search
//!
//! Keyword (BM25) scores and cosine similarities live on different scales,
//! so lists are merged by rank position only:
//!
//! ```text
//! score(item) = Σ over lists  weight / (k + position + 1)      position is 0-based
//! ```
//!
//! Higher `k` flattens the influence of position, lower `k` sharpens it.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::matching::constraints::ConstraintReport;
use crate::matching::score::MatchScore;

/// Conventional RRF damping constant.
pub const DEFAULT_RRF_K: f64 = 60.0;

/// A candidate placed within one ranking pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// Job or teacher id
    pub id: String,
    /// 1-based position in this ranking
    pub rank: usize,
    /// Ranking score: fused overall score, BM25 score or RRF score
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_score: Option<MatchScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<ConstraintReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl RankedResult {
    #[must_use]
    pub fn new(id: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            rank: 0,
            score,
            match_score: None,
            constraints: None,
            created_at: None,
        }
    }
}

/// Reciprocal Rank Fusion parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RrfConfig {
    /// K parameter (default: 60)
    pub k: f64,
    /// Weight for keyword (BM25) results
    pub keyword_weight: f64,
    /// Weight for semantic results
    pub semantic_weight: f64,
}

impl Default for RrfConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_RRF_K,
            keyword_weight: 1.0,
            semantic_weight: 1.0,
        }
    }
}

impl RrfConfig {
    #[must_use]
    pub fn with_k(k: f64) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }
}

/// Merge independently ranked lists into one consensus ranking.
///
/// Items are identified by `id`. Ties on fused score go to the item with
/// the best single-list position, then to the smaller id.
#[must_use]
pub fn reciprocal_rank_fusion(lists: &[Vec<RankedResult>], k: f64) -> Vec<RankedResult> {
    fuse(lists.iter().map(|list| (list.as_slice(), 1.0)), k)
}

/// Fuse a keyword ranking with a semantic ranking using per-list weights.
#[must_use]
pub fn fuse_weighted(
    keyword: &[RankedResult],
    semantic: &[RankedResult],
    config: &RrfConfig,
) -> Vec<RankedResult> {
    fuse(
        [
            (keyword, config.keyword_weight),
            (semantic, config.semantic_weight),
        ],
        config.k,
    )
}

struct FusedEntry {
    result: RankedResult,
    score: f64,
    best_position: usize,
}

fn fuse<'a>(
    lists: impl IntoIterator<Item = (&'a [RankedResult], f64)>,
    k: f64,
) -> Vec<RankedResult> {
    let k = if k.is_finite() && k >= 0.0 {
        k
    } else {
        warn!(k, "invalid RRF k, falling back to default");
        DEFAULT_RRF_K
    };

    let mut fused: HashMap<String, FusedEntry> = HashMap::new();
    for (list, weight) in lists {
        let mut seen = HashSet::new();
        for (position, item) in list.iter().enumerate() {
            if !seen.insert(item.id.as_str()) {
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let contribution = weight / (k + position as f64 + 1.0);
            let entry = fused.entry(item.id.clone()).or_insert_with(|| FusedEntry {
                result: item.clone(),
                score: 0.0,
                best_position: position,
            });
            entry.score += contribution;
            entry.best_position = entry.best_position.min(position);
            if entry.result.match_score.is_none() {
                entry.result.match_score = item.match_score.clone();
            }
            if entry.result.constraints.is_none() {
                entry.result.constraints = item.constraints.clone();
            }
            if entry.result.created_at.is_none() {
                entry.result.created_at = item.created_at;
            }
        }
    }

    let mut entries: Vec<FusedEntry> = fused.into_values().collect();
    entries.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.best_position.cmp(&b.best_position))
            .then_with(|| a.result.id.cmp(&b.result.id))
    });

    entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| RankedResult {
            rank: idx + 1,
            score: entry.score,
            ..entry.result
        })
        .collect()
}
