use std::sync::Arc;
use std::time::Duration;

use nexus_match::matching::{
    InMemoryCorpus, InvalidationEvent, MatchDirection, MatchFilters, MatchSubject, RankOptions,
};
use nexus_match::search::cache::match_cache_key;
use nexus_match::search::{CacheStats, CacheStore, MatchCache, MemoryCacheStore, RankedResult};
use nexus_match::storage::SqliteCacheStore;
use nexus_match::test_utils::fixtures::{sample_job, sample_teacher};
use tempfile::tempdir;

use crate::{HOUR, embed_job, embed_teacher, service_over};

fn corpus() -> InMemoryCorpus {
    let mut teacher = sample_teacher("teacher-1");
    embed_teacher(&mut teacher, &[1.0, 0.0, 0.0]);
    let mut job_1 = sample_job("job-1");
    embed_job(&mut job_1, &[1.0, 0.0, 0.0]);
    let mut job_2 = sample_job("job-2");
    embed_job(&mut job_2, &[0.0, 1.0, 0.0]);
    InMemoryCorpus::new(vec![job_1, job_2], vec![teacher])
}

#[test]
fn sqlite_cache_serves_repeat_queries_across_services() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.db");
    let corpus = corpus();
    let subject = MatchSubject::Teacher(&corpus.teachers[0]);
    let filters = MatchFilters::default();
    let options = RankOptions::default();

    let first = {
        let store = Arc::new(SqliteCacheStore::open(&path).unwrap());
        service_over(&corpus, store, Arc::new(CacheStats::new()))
            .rank_candidates(subject, &filters, &options)
            .unwrap()
    };

    let stats = Arc::new(CacheStats::new());
    let store = Arc::new(SqliteCacheStore::open(&path).unwrap());
    let service = service_over(&corpus, store.clone(), stats.clone());
    let second = service.rank_candidates(subject, &filters, &options).unwrap();

    assert_eq!(first, second);
    assert_eq!(stats.snapshot().match_hits, 1);

    let removed = service
        .handle_event(&InvalidationEvent::JobUpdated("job-1".to_string()))
        .unwrap();
    assert_eq!(removed, 1);
    assert!(store.is_empty().unwrap());
}

#[test]
fn expired_entries_are_misses() {
    let store = Arc::new(MemoryCacheStore::new(8));
    let stats = Arc::new(CacheStats::new());
    let cache = MatchCache::new(store, stats.clone(), Duration::ZERO);
    let key = match_cache_key(MatchDirection::JobsForTeacher, "teacher-1", "f");

    cache.cache_matches(&key, &[RankedResult::new("job-1", 70.0)]);
    assert!(cache.get_cached_matches(&key).is_none());
    assert_eq!(stats.snapshot().match_misses, 1);
}

#[test]
fn invalidation_is_scoped_to_the_entity() {
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new(8));
    let cache = MatchCache::new(store, Arc::new(CacheStats::new()), HOUR);
    let results = [RankedResult::new("job-1", 70.0)];

    let own = match_cache_key(MatchDirection::JobsForTeacher, "teacher-1", "f");
    let prefix_twin = match_cache_key(MatchDirection::JobsForTeacher, "teacher-10", "f");
    let other = match_cache_key(MatchDirection::TeachersForJob, "job-1", "f");
    for key in [&own, &prefix_twin, &other] {
        cache.cache_matches(key, &results);
    }

    assert_eq!(cache.invalidate_match_cache("teacher-1").unwrap(), 1);
    assert!(cache.get_cached_matches(&own).is_none());
    assert!(cache.get_cached_matches(&prefix_twin).is_some());
    assert!(cache.get_cached_matches(&other).is_some());

    assert_eq!(cache.invalidate_all_match_caches().unwrap(), 2);
}

#[test]
fn corrupt_entries_degrade_to_a_miss() {
    let store = Arc::new(SqliteCacheStore::open_in_memory().unwrap());
    let stats = Arc::new(CacheStats::new());
    let cache = MatchCache::new(store.clone(), stats.clone(), HOUR);
    let key = match_cache_key(MatchDirection::TeachersForJob, "job-1", "f");

    store.set(&key, "{not json", HOUR).unwrap();
    assert!(cache.get_cached_matches(&key).is_none());
    assert_eq!(stats.snapshot().errors, 1);
    assert!(store.get(&key).unwrap().is_none());
}
