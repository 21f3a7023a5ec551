//! Core record and vector types

pub mod records;
pub mod vector;

pub use records::{JobPosting, JobStatus, TeacherProfile};
pub use vector::{EmbeddingVector, StoredEmbedding};
