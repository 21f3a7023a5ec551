//! nexus-match cache - Inspect and invalidate the match cache

use std::sync::Arc;

use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::{MatchError, Result};
use crate::matching::corpus::InMemoryCorpus;
use crate::matching::service::{InvalidationEvent, MatchService};
use crate::search::cache::CacheStatsSnapshot;

#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show backend, size and hit counters
    Stats,

    /// Drop cached rankings for one job or teacher
    Invalidate(InvalidateArgs),

    /// Drop every cached ranking
    Clear,

    /// Remove expired rows from the persistent store
    Purge,
}

#[derive(Args, Debug)]
pub struct InvalidateArgs {
    /// Job or teacher id
    pub id: String,

    /// What changed; also drops the opposite direction's rankings
    #[arg(long, value_enum)]
    pub event: Option<ChangeKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChangeKind {
    JobUpdated,
    JobDeleted,
    ProfileUpdated,
}

impl ChangeKind {
    fn event(self, id: &str) -> InvalidationEvent {
        match self {
            Self::JobUpdated => InvalidationEvent::JobUpdated(id.to_string()),
            Self::JobDeleted => InvalidationEvent::JobDeleted(id.to_string()),
            Self::ProfileUpdated => InvalidationEvent::ProfileUpdated(id.to_string()),
        }
    }
}

#[derive(Serialize)]
struct StatsOutput {
    enabled: bool,
    backend: String,
    ttl_secs: u64,
    entries: Option<usize>,
    counters: CacheStatsSnapshot,
    match_hit_rate: f64,
    embedding_hit_rate: f64,
}

#[derive(Serialize)]
struct RemovedOutput<'a> {
    action: &'a str,
    removed: usize,
}

pub fn run(ctx: &AppContext, args: &CacheArgs) -> Result<()> {
    match &args.command {
        CacheCommand::Stats => stats(ctx),
        CacheCommand::Invalidate(invalidate) => {
            let removed = match invalidate.event {
                Some(kind) => service(ctx)?.handle_event(&kind.event(&invalidate.id))?,
                None => ctx.match_cache().invalidate_match_cache(&invalidate.id)?,
            };
            report(ctx, "invalidate", removed)
        }
        CacheCommand::Clear => {
            let removed = service(ctx)?.handle_event(&InvalidationEvent::ScoringChanged)?;
            report(ctx, "clear", removed)
        }
        CacheCommand::Purge => {
            let store = ctx.sqlite_store().ok_or_else(|| {
                MatchError::Cache("purge needs the sqlite cache backend".to_string())
            })?;
            report(ctx, "purge", store.purge_expired()?)
        }
    }
}

/// Invalidation only touches the cache, so an empty corpus is enough.
fn service(ctx: &AppContext) -> Result<MatchService> {
    ctx.service(Arc::new(InMemoryCorpus::default()))
}

fn stats(ctx: &AppContext) -> Result<()> {
    let entries = match (ctx.sqlite_store(), ctx.memory_store()) {
        (Some(store), _) => Some(store.len()?),
        (None, Some(store)) => Some(store.len()),
        (None, None) => None,
    };
    let counters = ctx.stats.snapshot();
    let output = StatsOutput {
        enabled: ctx.config.cache.enabled,
        backend: ctx.config.cache.backend.clone(),
        ttl_secs: ctx.config.cache.ttl.as_secs(),
        entries,
        counters,
        match_hit_rate: counters.match_hit_rate(),
        embedding_hit_rate: counters.embedding_hit_rate(),
    };

    if ctx.robot_mode {
        return emit_json(&robot_ok(&output));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Match cache")
        .kv("enabled", &output.enabled.to_string())
        .kv("backend", &output.backend)
        .kv(
            "ttl",
            &humantime_serde::re::humantime::format_duration(ctx.config.cache.ttl).to_string(),
        )
        .kv(
            "entries",
            &output
                .entries
                .map_or_else(|| "-".to_string(), |n| n.to_string()),
        )
        .kv(
            "match hits",
            &format!(
                "{} / {} ({:.1}%)",
                counters.match_hits,
                counters.match_hits + counters.match_misses,
                output.match_hit_rate * 100.0
            ),
        )
        .kv("errors", &counters.errors.to_string());
    emit_human(&layout);
    Ok(())
}

fn report(ctx: &AppContext, action: &str, removed: usize) -> Result<()> {
    if ctx.robot_mode {
        return emit_json(&robot_ok(RemovedOutput { action, removed }));
    }
    let mut layout = HumanLayout::new();
    layout.title(&format!("cache {action}")).kv("removed", &removed.to_string());
    emit_human(&layout);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::matching::ranking::MatchDirection;
    use crate::search::cache::match_cache_key;
    use crate::search::hybrid::RankedResult;

    fn seeded_context() -> AppContext {
        let ctx = AppContext::from_config(Config::default()).unwrap();
        let cache = ctx.match_cache();
        let results = vec![RankedResult::new("x", 1.0)];
        cache.cache_matches(
            &match_cache_key(MatchDirection::JobsForTeacher, "teacher-1", "a"),
            &results,
        );
        cache.cache_matches(
            &match_cache_key(MatchDirection::JobsForTeacher, "teacher-2", "a"),
            &results,
        );
        cache.cache_matches(
            &match_cache_key(MatchDirection::TeachersForJob, "job-1", "a"),
            &results,
        );
        ctx
    }

    #[test]
    fn job_update_drops_job_and_all_teacher_rankings() {
        let ctx = seeded_context();
        let removed = service(&ctx)
            .unwrap()
            .handle_event(&ChangeKind::JobUpdated.event("job-1"))
            .unwrap();
        assert_eq!(removed, 3);
    }

    #[test]
    fn plain_invalidate_is_scoped_to_the_entity() {
        let ctx = seeded_context();
        assert_eq!(ctx.match_cache().invalidate_match_cache("teacher-1").unwrap(), 1);
        assert_eq!(ctx.memory_store().unwrap().len(), 2);
    }

    #[test]
    fn purge_requires_sqlite_backend() {
        let ctx = AppContext::from_config(Config::default()).unwrap();
        let args = CacheArgs {
            command: CacheCommand::Purge,
        };
        assert!(matches!(run(&ctx, &args), Err(MatchError::Cache(_))));
    }
}
