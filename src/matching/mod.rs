//! Matching: constraints, score fusion, ranking and the service that ties
//! them to a corpus and a cache.

pub mod constraints;
pub mod corpus;
pub mod ranking;
pub mod score;
pub mod service;

pub use constraints::{ConstraintEvaluator, ConstraintKind, ConstraintReport, VisaRule, VisaRules};
pub use corpus::{CorpusSource, InMemoryCorpus, MatchFilters, RefreshReport, refresh_embeddings};
pub use ranking::{Candidate, MatchDirection, MatchQuery, RankOptions, rank_candidates};
pub use score::{MatchScore, ReferenceVectors, ScoreWeights, calculate_match_score};
pub use service::{InvalidationEvent, MatchService, MatchSubject, PairScore};
