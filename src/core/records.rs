//! Job postings and teacher profiles as seen by the matcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::vector::StoredEmbedding;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Active,
    Draft,
    Closed,
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub school_name: String,
    #[serde(default)]
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub min_years_experience: Option<u32>,
    #[serde(default)]
    pub required_certifications: Vec<String>,
    /// Whether the school sponsors a work visa. Without sponsorship only
    /// citizens of the job's country are eligible.
    #[serde(default = "default_true")]
    pub visa_sponsorship: bool,
    #[serde(default)]
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<StoredEmbedding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub citizenship: Option<String>,
    #[serde(default)]
    pub years_experience: Option<u32>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub has_degree: Option<bool>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub preferred_countries: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_embedding: Option<StoredEmbedding>,
    /// Embedding of the intro-video transcript. Transcription happens
    /// upstream, so this is never regenerated here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_embedding: Option<StoredEmbedding>,
}
