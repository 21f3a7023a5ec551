//! nexus-match - teacher/job match scoring for the Global Educator Nexus
//!
//! Fuses resume similarity, video similarity and hard-constraint checks into
//! a single 0-100 score, ranks candidates with a TTL cache in front, and
//! merges vector and keyword rankings with Reciprocal Rank Fusion.

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod matching;
pub mod search;
pub mod storage;
pub mod test_utils;

pub use error::{MatchError, Result};
