//! Shared test utilities for nexus-match.

pub mod fixtures;
pub mod logging;
