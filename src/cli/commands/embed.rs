//! nexus-match embed - Refresh stale embeddings in a corpus file

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::error::Result;
use crate::matching::corpus::{
    InMemoryCorpus, RefreshReport, needs_regeneration, refresh_embeddings,
};
use crate::search::batch::BatchOptions;
use crate::search::embeddings::{
    EmbeddingProvider, job_embedding_text, source_hash, teacher_embedding_text,
};

#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Corpus file (JSON or YAML)
    #[arg(long)]
    pub corpus: PathBuf,

    /// Write the refreshed corpus here instead of in place
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Only count what would be embedded
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Serialize)]
struct EmbedOutput {
    model: String,
    dry_run: bool,
    pending: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<RefreshReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    written_to: Option<PathBuf>,
    invalidated: usize,
}

pub fn run(ctx: &AppContext, args: &EmbedArgs) -> Result<()> {
    let input = ctx.project_root.join(&args.corpus);
    let mut corpus = InMemoryCorpus::load(&input)?;
    let provider = ctx.provider()?;
    let pending = count_pending(&corpus, provider.as_ref());

    let mut output = EmbedOutput {
        model: provider.model().to_string(),
        dry_run: args.dry_run,
        pending,
        report: None,
        written_to: None,
        invalidated: 0,
    };

    if !args.dry_run && pending > 0 {
        let options = BatchOptions::from_config(&ctx.config.embedding);
        let report = refresh_embeddings(provider.as_ref(), &mut corpus, &options);

        let target = args
            .output
            .as_ref()
            .map_or_else(|| input.clone(), |path| ctx.project_root.join(path));
        corpus.save(&target)?;
        info!(path = %target.display(), "wrote refreshed corpus");

        if report.embedded > 0 {
            output.invalidated = ctx.match_cache().invalidate_all_match_caches()?;
        }
        output.report = Some(report);
        output.written_to = Some(target);
    }

    if ctx.robot_mode {
        return emit_json(&robot_ok(&output));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Embedding refresh")
        .kv("model", &output.model)
        .kv("pending", &output.pending.to_string());
    if let Some(report) = &output.report {
        layout
            .kv("embedded", &report.embedded.to_string())
            .kv("skipped", &report.skipped.to_string())
            .kv("failed", &report.failed.to_string());
    }
    if let Some(path) = &output.written_to {
        layout.kv("written to", &path.display().to_string());
    }
    if args.dry_run {
        layout.push_line(String::new()).push_line("dry run, nothing written");
    }
    emit_human(&layout);
    Ok(())
}

/// Jobs and teacher resumes whose stored embedding is missing or stale.
fn count_pending(corpus: &InMemoryCorpus, provider: &dyn EmbeddingProvider) -> usize {
    let jobs = corpus.jobs.iter().filter(|job| {
        let hash = source_hash(&job_embedding_text(job));
        needs_regeneration(job.embedding.as_ref(), &hash, provider)
    });
    let teachers = corpus.teachers.iter().filter(|teacher| {
        let hash = source_hash(&teacher_embedding_text(teacher));
        needs_regeneration(teacher.resume_embedding.as_ref(), &hash, provider)
    });
    jobs.count() + teachers.count()
}
