//! nexus-match rank - Rank a corpus for a teacher or a job

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, ranked_line, robot_ok};
use crate::error::{MatchError, Result};
use crate::matching::corpus::{CorpusSource, MatchFilters};
use crate::matching::ranking::{MatchDirection, RankOptions};
use crate::matching::service::MatchSubject;
use crate::search::hybrid::RankedResult;

#[derive(Args, Debug)]
pub struct RankArgs {
    /// Corpus file (JSON or YAML)
    #[arg(long)]
    pub corpus: PathBuf,

    /// Rank jobs for this teacher
    #[arg(long, conflicts_with = "job", required_unless_present = "job")]
    pub teacher: Option<String>,

    /// Rank teachers for this job
    #[arg(long)]
    pub job: Option<String>,

    /// Maximum results (defaults to ranking.top_n)
    #[arg(long, short)]
    pub top: Option<usize>,

    /// Minimum resume similarity, 0-100 (defaults to ranking.min_similarity)
    #[arg(long)]
    pub min_similarity: Option<f64>,

    /// Restrict to these countries
    #[arg(long)]
    pub country: Vec<String>,

    /// Restrict to these subjects
    #[arg(long)]
    pub subject: Vec<String>,

    /// Include jobs that are not active
    #[arg(long)]
    pub include_inactive: bool,

    /// Fuse with a BM25 keyword ranking for these terms
    #[arg(long)]
    pub keywords: Option<String>,

    /// RRF constant for hybrid ranking (defaults to ranking.rrf_k)
    #[arg(long)]
    pub rrf_k: Option<f64>,
}

#[derive(Serialize)]
struct RankOutput<'a> {
    entity_id: &'a str,
    direction: MatchDirection,
    mode: &'a str,
    results: &'a [RankedResult],
}

pub fn run(ctx: &AppContext, args: &RankArgs) -> Result<()> {
    let corpus = super::load_corpus(ctx, &args.corpus)?;
    let filters = MatchFilters {
        countries: args.country.clone(),
        subjects: args.subject.clone(),
        include_inactive: args.include_inactive,
    };
    let options = RankOptions {
        top_n: args.top.unwrap_or(ctx.config.ranking.top_n),
        min_similarity: args
            .min_similarity
            .unwrap_or(ctx.config.ranking.min_similarity),
    };

    let teacher = match &args.teacher {
        Some(id) => Some(
            corpus
                .teacher(id)?
                .ok_or_else(|| MatchError::NotFound(format!("teacher {id}")))?,
        ),
        None => None,
    };
    let job = match (&teacher, &args.job) {
        (None, Some(id)) => Some(
            corpus
                .job(id)?
                .ok_or_else(|| MatchError::NotFound(format!("job {id}")))?,
        ),
        _ => None,
    };
    let subject = match (&teacher, &job) {
        (Some(teacher), _) => MatchSubject::Teacher(teacher),
        (None, Some(job)) => MatchSubject::Job(job),
        (None, None) => {
            return Err(MatchError::Config(
                "rank needs --teacher or --job".to_string(),
            ));
        }
    };

    let service = ctx.service(corpus)?;
    let (mode, results) = match &args.keywords {
        Some(keywords) => {
            let k = args.rrf_k.unwrap_or(ctx.config.ranking.rrf_k);
            let results = service.hybrid_rank(subject, keywords, &filters, &options, k)?;
            ("hybrid", results)
        }
        None => ("vector", service.rank_candidates(subject, &filters, &options)?),
    };

    let output = RankOutput {
        entity_id: subject.id(),
        direction: subject.direction(),
        mode,
        results: &results,
    };
    if ctx.robot_mode {
        return emit_json(&robot_ok(&output));
    }

    let mut layout = HumanLayout::new();
    layout
        .title(&format!("{} ({mode})", subject.direction().as_str()))
        .kv("entity", subject.id())
        .kv("results", &results.len().to_string())
        .push_line(String::new());
    if results.is_empty() {
        layout.push_line("no candidates matched");
    }
    for result in &results {
        layout.push_line(ranked_line(result));
    }
    emit_human(&layout);
    Ok(())
}
