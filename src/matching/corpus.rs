//! Corpus access: where jobs and teachers come from.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::{JobPosting, JobStatus, StoredEmbedding, TeacherProfile};
use crate::error::Result;
use crate::matching::constraints::normalize_country;
use crate::search::batch::{BatchOptions, embed_batch};
use crate::search::embeddings::{
    EmbeddingProvider, job_embedding_text, source_hash, teacher_embedding_text,
};

/// Narrows the corpus before scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchFilters {
    /// Job countries, or a teacher's preferred countries. Empty accepts all.
    pub countries: Vec<String>,
    /// Any overlap with the record's subjects. Empty accepts all.
    pub subjects: Vec<String>,
    /// Include draft and closed jobs.
    pub include_inactive: bool,
}

impl MatchFilters {
    #[must_use]
    pub fn accepts_job(&self, job: &JobPosting) -> bool {
        if !self.include_inactive && job.status != JobStatus::Active {
            return false;
        }
        if !self.countries.is_empty() {
            let country = normalize_country(&job.country);
            if !self.countries.iter().any(|c| normalize_country(c) == country) {
                return false;
            }
        }
        subjects_overlap(&self.subjects, &job.subjects)
    }

    /// Teachers without stated preferences are open to any country.
    #[must_use]
    pub fn accepts_teacher(&self, teacher: &TeacherProfile) -> bool {
        if !self.countries.is_empty() && !teacher.preferred_countries.is_empty() {
            let wanted: Vec<String> = self.countries.iter().map(|c| normalize_country(c)).collect();
            if !teacher
                .preferred_countries
                .iter()
                .any(|c| wanted.contains(&normalize_country(c)))
            {
                return false;
            }
        }
        subjects_overlap(&self.subjects, &teacher.subjects)
    }
}

fn subjects_overlap(wanted: &[String], held: &[String]) -> bool {
    wanted.is_empty()
        || wanted.iter().any(|w| {
            held.iter()
                .any(|h| h.trim().eq_ignore_ascii_case(w.trim()))
        })
}

/// Read access to the pre-embedded corpus.
pub trait CorpusSource: Send + Sync {
    fn jobs(&self, filters: &MatchFilters) -> Result<Vec<JobPosting>>;

    fn teachers(&self, filters: &MatchFilters) -> Result<Vec<TeacherProfile>>;

    fn job(&self, id: &str) -> Result<Option<JobPosting>>;

    fn teacher(&self, id: &str) -> Result<Option<TeacherProfile>>;
}

/// Corpus held in memory, loadable from a JSON or YAML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryCorpus {
    pub jobs: Vec<JobPosting>,
    pub teachers: Vec<TeacherProfile>,
}

impl InMemoryCorpus {
    #[must_use]
    pub const fn new(jobs: Vec<JobPosting>, teachers: Vec<TeacherProfile>) -> Self {
        Self { jobs, teachers }
    }

    /// Load from `path`; `.yaml`/`.yml` is parsed as YAML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let corpus: Self = if is_yaml(path) {
            serde_yaml::from_str(&raw)?
        } else {
            serde_json::from_str(&raw)?
        };
        debug!(
            path = %path.display(),
            jobs = corpus.jobs.len(),
            teachers = corpus.teachers.len(),
            "loaded corpus"
        );
        Ok(corpus)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = if is_yaml(path) {
            serde_yaml::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        std::fs::write(path, raw)?;
        Ok(())
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

impl CorpusSource for InMemoryCorpus {
    fn jobs(&self, filters: &MatchFilters) -> Result<Vec<JobPosting>> {
        Ok(self
            .jobs
            .iter()
            .filter(|job| filters.accepts_job(job))
            .cloned()
            .collect())
    }

    fn teachers(&self, filters: &MatchFilters) -> Result<Vec<TeacherProfile>> {
        Ok(self
            .teachers
            .iter()
            .filter(|teacher| filters.accepts_teacher(teacher))
            .cloned()
            .collect())
    }

    fn job(&self, id: &str) -> Result<Option<JobPosting>> {
        Ok(self.jobs.iter().find(|job| job.id == id).cloned())
    }

    fn teacher(&self, id: &str) -> Result<Option<TeacherProfile>> {
        Ok(self.teachers.iter().find(|t| t.id == id).cloned())
    }
}

/// True when `stored` is missing, was built from different text, or has a
/// different length than the provider now produces.
#[must_use]
pub fn needs_regeneration(
    stored: Option<&StoredEmbedding>,
    hash: &str,
    provider: &dyn EmbeddingProvider,
) -> bool {
    stored.is_none_or(|s| !s.is_fresh(hash) || s.vector.dims() != provider.dims())
}

/// Outcome of [`refresh_embeddings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub embedded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Re-embed every job and teacher resume whose stored embedding is missing
/// or stale. Video embeddings are produced upstream and left untouched.
pub fn refresh_embeddings(
    provider: &dyn EmbeddingProvider,
    corpus: &mut InMemoryCorpus,
    options: &BatchOptions,
) -> RefreshReport {
    let mut report = RefreshReport::default();
    let mut pending: Vec<(String, String)> = Vec::new();
    let mut hashes: HashMap<String, String> = HashMap::new();

    for job in &corpus.jobs {
        let text = job_embedding_text(job);
        let hash = source_hash(&text);
        if needs_regeneration(job.embedding.as_ref(), &hash, provider) {
            let key = format!("job:{}", job.id);
            hashes.insert(key.clone(), hash);
            pending.push((key, text));
        } else {
            report.skipped += 1;
        }
    }
    for teacher in &corpus.teachers {
        let text = teacher_embedding_text(teacher);
        let hash = source_hash(&text);
        if needs_regeneration(teacher.resume_embedding.as_ref(), &hash, provider) {
            let key = format!("teacher:{}", teacher.id);
            hashes.insert(key.clone(), hash);
            pending.push((key, text));
        } else {
            report.skipped += 1;
        }
    }

    let mut fresh: HashMap<String, StoredEmbedding> = embed_batch(provider, &pending, options)
        .into_iter()
        .filter_map(|item| {
            let hash = hashes.remove(&item.id)?;
            Some((item.id, StoredEmbedding::new(item.vector, hash, provider.model())))
        })
        .collect();

    report.embedded = fresh.len();
    report.failed = pending.len() - fresh.len();

    for job in &mut corpus.jobs {
        if let Some(embedding) = fresh.remove(&format!("job:{}", job.id)) {
            job.embedding = Some(embedding);
        }
    }
    for teacher in &mut corpus.teachers {
        if let Some(embedding) = fresh.remove(&format!("teacher:{}", teacher.id)) {
            teacher.resume_embedding = Some(embedding);
        }
    }

    info!(
        embedded = report.embedded,
        skipped = report.skipped,
        failed = report.failed,
        "refreshed corpus embeddings"
    );
    report
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::search::embeddings::HashEmbedder;
    use crate::test_utils::fixtures::{sample_corpus, sample_job, sample_teacher};

    fn no_delay() -> BatchOptions {
        BatchOptions {
            batch_size: 10,
            delay: Duration::ZERO,
        }
    }

    #[test]
    fn inactive_jobs_are_filtered_by_default() {
        let mut closed = sample_job("job-closed");
        closed.status = JobStatus::Closed;
        let corpus = InMemoryCorpus::new(vec![sample_job("job-open"), closed], Vec::new());

        let jobs = corpus.jobs(&MatchFilters::default()).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "job-open");

        let all = corpus
            .jobs(&MatchFilters {
                include_inactive: true,
                ..MatchFilters::default()
            })
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn country_filter_normalises_names() {
        let corpus = InMemoryCorpus::new(vec![sample_job("job-1")], Vec::new());
        let filters = MatchFilters {
            countries: vec!["Korea".to_string()],
            ..MatchFilters::default()
        };
        assert_eq!(corpus.jobs(&filters).unwrap().len(), 1);

        let filters = MatchFilters {
            countries: vec!["Japan".to_string()],
            ..MatchFilters::default()
        };
        assert!(corpus.jobs(&filters).unwrap().is_empty());
    }

    #[test]
    fn teacher_filter_honours_preferences() {
        let mut picky = sample_teacher("picky");
        picky.preferred_countries = vec!["Japan".to_string()];
        let open = sample_teacher("open");
        let corpus = InMemoryCorpus::new(Vec::new(), vec![picky, open]);

        let filters = MatchFilters {
            countries: vec!["South Korea".to_string()],
            ..MatchFilters::default()
        };
        let ids: Vec<String> = corpus
            .teachers(&filters)
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["open".to_string()]);
    }

    #[test]
    fn subject_filter_is_case_insensitive() {
        let corpus = InMemoryCorpus::new(vec![sample_job("job-1")], Vec::new());
        let filters = MatchFilters {
            subjects: vec!["english".to_string()],
            ..MatchFilters::default()
        };
        assert_eq!(corpus.jobs(&filters).unwrap().len(), 1);
    }

    #[test]
    fn lookup_by_id() {
        let corpus = sample_corpus();
        assert!(corpus.job("job-1").unwrap().is_some());
        assert!(corpus.teacher("teacher-1").unwrap().is_some());
        assert!(corpus.job("missing").unwrap().is_none());
    }

    #[test]
    fn refresh_embeds_missing_then_skips_fresh() {
        let provider = HashEmbedder::new(64);
        let mut corpus =
            InMemoryCorpus::new(vec![sample_job("job-1")], vec![sample_teacher("teacher-1")]);

        let first = refresh_embeddings(&provider, &mut corpus, &no_delay());
        assert_eq!(first.embedded, 2);
        assert_eq!(first.failed, 0);
        assert!(corpus.jobs[0].embedding.is_some());
        assert!(corpus.teachers[0].resume_embedding.is_some());

        let second = refresh_embeddings(&provider, &mut corpus, &no_delay());
        assert_eq!(second.embedded, 0);
        assert_eq!(second.skipped, 2);
    }

    #[test]
    fn edited_record_is_stale() {
        let provider = HashEmbedder::new(64);
        let mut corpus = InMemoryCorpus::new(vec![sample_job("job-1")], Vec::new());
        refresh_embeddings(&provider, &mut corpus, &no_delay());
        let before = corpus.jobs[0].embedding.clone();

        corpus.jobs[0].description = "Teach science in a bilingual program.".to_string();
        let report = refresh_embeddings(&provider, &mut corpus, &no_delay());
        assert_eq!(report.embedded, 1);
        assert_ne!(corpus.jobs[0].embedding, before);
    }

    #[test]
    fn dimension_change_forces_regeneration() {
        let mut corpus = InMemoryCorpus::new(vec![sample_job("job-1")], Vec::new());
        refresh_embeddings(&HashEmbedder::new(32), &mut corpus, &no_delay());
        let report = refresh_embeddings(&HashEmbedder::new(64), &mut corpus, &no_delay());
        assert_eq!(report.embedded, 1);
        assert_eq!(corpus.jobs[0].embedding.as_ref().unwrap().vector.dims(), 64);
    }

    #[test]
    fn json_and_yaml_files_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = sample_corpus();
        for name in ["corpus.json", "corpus.yaml"] {
            let path = dir.path().join(name);
            corpus.save(&path).unwrap();
            assert_eq!(InMemoryCorpus::load(&path).unwrap(), corpus);
        }
    }
}
