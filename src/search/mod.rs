//! Search primitives for matching
//!
//! Vector similarity over embeddings, BM25 keyword ranking and RRF fusion,
//! plus the cache that sits in front of ranking.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                   Job posting / teacher profile                │
//! └────────────────────────────────────────────────────────────────┘
//!                     │                          │
//!                     ▼                          ▼
//! ┌──────────────────────────────┐  ┌──────────────────────────────┐
//! │       KeywordIndex           │  │   EmbeddingProvider          │
//! │   (Tantivy BM25 search)      │  │   + cosine similarity        │
//! └──────────────────────────────┘  └──────────────────────────────┘
//!                     │                          │
//!                     └──────────┬───────────────┘
//!                                ▼
//!                ┌───────────────────────────────┐
//!                │   RRF Fusion (hybrid.rs)      │
//!                └───────────────────────────────┘
//!                                │
//!                                ▼
//!                     Combined ranked results
//! ```

pub mod batch;
pub mod cache;
pub mod embeddings;
pub mod hybrid;
pub mod keyword;
pub mod similarity;

// Re-export main types
pub use batch::{BatchOptions, EmbeddedItem, embed_batch};
pub use cache::{
    CacheEntry, CachePayload, CacheStats, CacheStatsSnapshot, CacheStore, MatchCache,
    MemoryCacheStore, NoopStats, StatsCollector,
};
pub use embeddings::{ApiEmbedder, EmbeddingProvider, HashEmbedder, build_embedder};
pub use hybrid::{RankedResult, RrfConfig, fuse_weighted, reciprocal_rank_fusion};
pub use keyword::{KeywordDoc, KeywordIndex};
pub use similarity::cosine_similarity;
