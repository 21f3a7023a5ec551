//! Property tests for the scoring and fusion primitives.

mod determinism_tests;
mod scoring_tests;
