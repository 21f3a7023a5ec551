//! Sample records and an isolated on-disk workspace for tests.

use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use crate::core::{JobPosting, JobStatus, TeacherProfile};
use crate::matching::corpus::InMemoryCorpus;

/// Midnight UTC on the given day of January 2026.
#[must_use]
pub fn day(n: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, n, 0, 0, 0)
        .single()
        .expect("valid fixture date")
}

/// An active ESL posting in Seoul that a typical applicant fully satisfies.
#[must_use]
pub fn sample_job(id: &str) -> JobPosting {
    JobPosting {
        id: id.to_string(),
        title: "ESL Teacher".to_string(),
        school_name: "Seoul Global Academy".to_string(),
        city: "Seoul".to_string(),
        country: "South Korea".to_string(),
        description: "Teach English conversation to middle school students.".to_string(),
        requirements: Some("Bachelor's degree and TEFL certificate".to_string()),
        subjects: vec!["English".to_string()],
        min_years_experience: Some(2),
        required_certifications: vec!["TEFL".to_string()],
        visa_sponsorship: true,
        status: JobStatus::Active,
        created_at: day(1),
        embedding: None,
    }
}

/// A degree-holding US citizen with TEFL and four years of experience.
#[must_use]
pub fn sample_teacher(id: &str) -> TeacherProfile {
    TeacherProfile {
        id: id.to_string(),
        name: "Jordan Lee".to_string(),
        citizenship: Some("United States".to_string()),
        years_experience: Some(4),
        certifications: vec!["TEFL".to_string(), "CELTA".to_string()],
        has_degree: Some(true),
        age: Some(31),
        subjects: vec!["English".to_string()],
        preferred_countries: Vec::new(),
        summary: Some("ESL teacher focused on conversation classes for teens.".to_string()),
        created_at: day(1),
        resume_embedding: None,
        video_embedding: None,
    }
}

/// Two jobs and two teachers, none embedded yet.
#[must_use]
pub fn sample_corpus() -> InMemoryCorpus {
    let mut math = sample_job("job-2");
    math.title = "Mathematics Teacher".to_string();
    math.school_name = "Shanghai International School".to_string();
    math.city = "Shanghai".to_string();
    math.country = "China".to_string();
    math.subjects = vec!["Math".to_string()];
    math.required_certifications = Vec::new();
    math.created_at = day(3);

    let mut newcomer = sample_teacher("teacher-2");
    newcomer.name = "Sam Okafor".to_string();
    newcomer.citizenship = Some("Nigeria".to_string());
    newcomer.years_experience = Some(1);
    newcomer.certifications = vec!["TEFL".to_string()];
    newcomer.created_at = day(2);

    InMemoryCorpus::new(
        vec![sample_job("job-1"), math],
        vec![sample_teacher("teacher-1"), newcomer],
    )
}

/// Temporary directory for corpus and config files.
pub struct CorpusFixture {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl Default for CorpusFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl CorpusFixture {
    #[must_use]
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        Self { temp_dir, root }
    }

    /// Write `content` to `relative_path`, creating parent directories.
    #[must_use]
    pub fn create_file(&self, relative_path: &str, content: &str) -> PathBuf {
        let full_path = self.root.join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&full_path, content).expect("Failed to write file");
        full_path
    }

    /// Save `corpus` under `name`; the extension picks JSON or YAML.
    #[must_use]
    pub fn write_corpus(&self, name: &str, corpus: &InMemoryCorpus) -> PathBuf {
        let path = self.root.join(name);
        corpus.save(&path).expect("Failed to write corpus");
        path
    }
}
