use std::collections::HashSet;

use proptest::prelude::*;

use nexus_match::core::{JobPosting, JobStatus, TeacherProfile};
use nexus_match::matching::{ConstraintEvaluator, MatchScore, ScoreWeights};
use nexus_match::search::{RankedResult, reciprocal_rank_fusion};
use nexus_match::test_utils::fixtures::{day, sample_job, sample_teacher};

const ALLOWED_CONSTRAINT_SCORES: [f64; 4] = [0.0, 33.33, 66.67, 100.0];

fn teacher_strategy() -> impl Strategy<Value = TeacherProfile> {
    (
        prop::option::of(prop::sample::select(vec![
            "United States",
            "UK",
            "South Korea",
            "Nigeria",
            "",
        ])),
        prop::option::of(0u32..15),
        prop::collection::vec(prop::sample::select(vec!["TEFL", "CELTA", "PGCE"]), 0..3),
        prop::option::of(any::<bool>()),
        prop::option::of(20u32..70),
    )
        .prop_map(|(citizenship, years, certs, degree, age)| {
            let mut teacher = sample_teacher("t");
            teacher.citizenship = citizenship.map(ToString::to_string);
            teacher.years_experience = years;
            teacher.certifications = certs.into_iter().map(ToString::to_string).collect();
            teacher.has_degree = degree;
            teacher.age = age;
            teacher
        })
}

fn job_strategy() -> impl Strategy<Value = JobPosting> {
    (
        prop::sample::select(vec!["South Korea", "China", "Japan", "Spain", "USA"]),
        prop::option::of(0u32..6),
        prop::collection::vec(prop::sample::select(vec!["TEFL", "CELTA", "QTS"]), 0..3),
        any::<bool>(),
    )
        .prop_map(|(country, min_years, certs, sponsorship)| {
            let mut job = sample_job("j");
            job.country = country.to_string();
            job.min_years_experience = min_years;
            job.required_certifications = certs.into_iter().map(ToString::to_string).collect();
            job.visa_sponsorship = sponsorship;
            job.status = JobStatus::Active;
            job.created_at = day(5);
            job
        })
}

fn ranked_lists() -> impl Strategy<Value = Vec<Vec<RankedResult>>> {
    prop::collection::vec(
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d", "e", "f"]), 0..6),
        0..4,
    )
    .prop_map(|lists| {
        lists
            .into_iter()
            .map(|ids| ids.into_iter().map(|id| RankedResult::new(id, 0.0)).collect())
            .collect()
    })
}

proptest! {
    #[test]
    fn test_overall_is_rounded_weighted_sum(
        resume in 0.0f64..=100.0,
        video in 0.0f64..=100.0,
        constraints in prop::sample::select(ALLOWED_CONSTRAINT_SCORES.to_vec()),
    ) {
        let score =
            MatchScore::from_components(resume, video, constraints, &ScoreWeights::default())
                .unwrap();
        let fused = 0.5 * resume + 0.3 * video + 0.2 * constraints;
        prop_assert!(score.overall <= 100);
        prop_assert!((f64::from(score.overall) - fused).abs() <= 0.5 + 1e-6);
    }

    #[test]
    fn test_out_of_range_components_rejected(resume in 100.001f64..1_000.0) {
        prop_assert!(
            MatchScore::from_components(resume, 0.0, 0.0, &ScoreWeights::default()).is_err()
        );
    }

    #[test]
    fn test_constraint_match_takes_discrete_values(
        teacher in teacher_strategy(),
        job in job_strategy(),
    ) {
        let report = ConstraintEvaluator::default().evaluate(&teacher, &job);
        prop_assert!(
            ALLOWED_CONSTRAINT_SCORES
                .iter()
                .any(|allowed| (report.constraint_match - allowed).abs() < 1e-9),
            "unexpected constraint_match {}",
            report.constraint_match
        );
        prop_assert_eq!(report.checks.len(), 3);
    }

    #[test]
    fn test_rrf_ranks_are_sequential_and_unique(
        lists in ranked_lists(),
        k in 0.0f64..200.0,
    ) {
        let fused = reciprocal_rank_fusion(&lists, k);

        let expected: HashSet<&str> = lists
            .iter()
            .flatten()
            .map(|r| r.id.as_str())
            .collect();
        let actual: HashSet<&str> = fused.iter().map(|r| r.id.as_str()).collect();
        prop_assert_eq!(actual, expected);
        prop_assert_eq!(fused.len(), expected_len(&lists));

        for (i, result) in fused.iter().enumerate() {
            prop_assert_eq!(result.rank, i + 1);
        }
        for pair in fused.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_rrf_is_deterministic(lists in ranked_lists()) {
        prop_assert_eq!(
            reciprocal_rank_fusion(&lists, 60.0),
            reciprocal_rank_fusion(&lists, 60.0)
        );
    }
}

fn expected_len(lists: &[Vec<RankedResult>]) -> usize {
    lists
        .iter()
        .flatten()
        .map(|r| r.id.as_str())
        .collect::<HashSet<_>>()
        .len()
}
