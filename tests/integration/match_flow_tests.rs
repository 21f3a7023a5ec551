use std::sync::Arc;

use nexus_match::matching::{
    ConstraintKind, InMemoryCorpus, MatchFilters, MatchSubject, RankOptions,
};
use nexus_match::search::{CacheStats, MemoryCacheStore};
use nexus_match::test_utils::fixtures::{day, sample_job, sample_teacher};

use crate::{embed_job, embed_teacher, service_over, stored};

/// job-a mirrors the teacher, job-b is close but wants QTS, job-c is
/// orthogonal.
fn three_job_corpus(with_video: bool) -> InMemoryCorpus {
    let mut teacher = sample_teacher("teacher-1");
    embed_teacher(&mut teacher, &[1.0, 0.0, 0.0]);
    if with_video {
        teacher.video_embedding = Some(stored(&[0.0, 1.0, 0.0], "intro video"));
    }

    let mut job_a = sample_job("job-a");
    embed_job(&mut job_a, &[1.0, 0.0, 0.0]);

    let mut job_b = sample_job("job-b");
    job_b.required_certifications = vec!["QTS".to_string()];
    embed_job(&mut job_b, &[0.6, 0.8, 0.0]);

    let mut job_c = sample_job("job-c");
    embed_job(&mut job_c, &[0.0, 1.0, 0.0]);

    InMemoryCorpus::new(vec![job_c, job_b, job_a], vec![teacher])
}

fn rank(corpus: &InMemoryCorpus, options: &RankOptions) -> Vec<nexus_match::search::RankedResult> {
    let service = service_over(
        corpus,
        Arc::new(MemoryCacheStore::new(16)),
        Arc::new(CacheStats::new()),
    );
    service
        .rank_candidates(
            MatchSubject::Teacher(&corpus.teachers[0]),
            &MatchFilters::default(),
            options,
        )
        .unwrap()
}

#[test]
fn three_jobs_rank_by_hand_computed_scores() {
    let corpus = three_job_corpus(false);
    let results = rank(&corpus, &RankOptions::default());

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["job-a", "job-b", "job-c"]);

    let overall: Vec<u8> = results
        .iter()
        .map(|r| r.match_score.as_ref().unwrap().overall)
        .collect();
    // 0.5*100 + 0.2*100, 0.5*60 + 0.2*66.67, 0.2*100
    assert_eq!(overall, [70, 43, 20]);

    let job_b = &results[1];
    let constraints = job_b.constraints.as_ref().unwrap();
    assert!(!constraints.passed(ConstraintKind::Certification));
    assert!((constraints.constraint_match - 66.67).abs() < 1e-9);
}

#[test]
fn video_signal_compares_against_the_teacher_video() {
    let corpus = three_job_corpus(true);
    let results = rank(&corpus, &RankOptions::default());

    let scored: Vec<(&str, u8)> = results
        .iter()
        .map(|r| (r.id.as_str(), r.match_score.as_ref().unwrap().overall))
        .collect();
    // video similarity: a 0, b 80, c 100
    assert_eq!(scored, [("job-a", 70), ("job-b", 67), ("job-c", 50)]);
}

#[test]
fn min_similarity_and_top_n_apply() {
    let corpus = three_job_corpus(false);

    let floor = RankOptions {
        min_similarity: 50.0,
        ..RankOptions::default()
    };
    let ids: Vec<String> = rank(&corpus, &floor).into_iter().map(|r| r.id).collect();
    assert_eq!(ids, ["job-a", "job-b"]);

    let top_one = RankOptions {
        top_n: 1,
        ..RankOptions::default()
    };
    let results = rank(&corpus, &top_one);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].rank, 1);
}

#[test]
fn equal_scores_prefer_newer_postings() {
    let mut corpus = three_job_corpus(false);
    let mut twin = sample_job("job-a2");
    twin.created_at = day(9);
    crate::embed_job(&mut twin, &[1.0, 0.0, 0.0]);
    corpus.jobs.push(twin);

    let results = rank(&corpus, &RankOptions::default());
    assert_eq!(results[0].id, "job-a2");
    assert_eq!(results[1].id, "job-a");
}

#[test]
fn filters_exclude_inactive_and_other_countries() {
    let mut corpus = three_job_corpus(false);
    corpus.jobs[0].status = nexus_match::core::JobStatus::Closed;
    corpus.jobs[1].country = "Japan".to_string();

    let service = service_over(
        &corpus,
        Arc::new(MemoryCacheStore::new(16)),
        Arc::new(CacheStats::new()),
    );
    let filters = MatchFilters {
        countries: vec!["south korea".to_string()],
        ..MatchFilters::default()
    };
    let results = service
        .rank_candidates(
            MatchSubject::Teacher(&corpus.teachers[0]),
            &filters,
            &RankOptions::default(),
        )
        .unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["job-a"]);
}

#[test]
fn teachers_rank_for_a_job() {
    let mut job = sample_job("job-1");
    embed_job(&mut job, &[1.0, 0.0, 0.0]);

    let mut strong = sample_teacher("teacher-strong");
    embed_teacher(&mut strong, &[1.0, 0.0, 0.0]);
    strong.video_embedding = Some(stored(&[1.0, 0.0, 0.0], "video"));

    let mut weak = sample_teacher("teacher-weak");
    weak.citizenship = None;
    embed_teacher(&mut weak, &[0.0, 1.0, 0.0]);

    let corpus = InMemoryCorpus::new(vec![job], vec![weak, strong]);
    let service = service_over(
        &corpus,
        Arc::new(MemoryCacheStore::new(16)),
        Arc::new(CacheStats::new()),
    );
    let results = service
        .rank_candidates(
            MatchSubject::Job(&corpus.jobs[0]),
            &MatchFilters::default(),
            &RankOptions::default(),
        )
        .unwrap();

    assert_eq!(results[0].id, "teacher-strong");
    assert_eq!(results[0].match_score.as_ref().unwrap().overall, 100);
    // missing citizenship fails the visa check: 0.2 * 66.67
    assert_eq!(results[1].match_score.as_ref().unwrap().overall, 13);
}
