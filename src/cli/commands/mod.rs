//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - run() function to execute the command

use std::path::Path;
use std::sync::Arc;

use clap::Subcommand;

pub mod cache;
pub mod embed;
pub mod fuse;
pub mod rank;
pub mod score;

use crate::app::AppContext;
use crate::error::Result;
use crate::matching::corpus::InMemoryCorpus;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score one teacher against one job posting
    Score(score::ScoreArgs),

    /// Rank jobs for a teacher, or teachers for a job
    Rank(rank::RankArgs),

    /// Merge ranked result lists with Reciprocal Rank Fusion
    Fuse(fuse::FuseArgs),

    /// Refresh stale or missing embeddings in a corpus file
    Embed(embed::EmbedArgs),

    /// Inspect and invalidate the match cache
    Cache(cache::CacheArgs),
}

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Score(args) => score::run(ctx, args),
        Commands::Rank(args) => rank::run(ctx, args),
        Commands::Fuse(args) => fuse::run(ctx, args),
        Commands::Embed(args) => embed::run(ctx, args),
        Commands::Cache(args) => cache::run(ctx, args),
    }
}

/// Corpus paths are relative to the project root.
fn load_corpus(ctx: &AppContext, path: &Path) -> Result<Arc<InMemoryCorpus>> {
    Ok(Arc::new(InMemoryCorpus::load(&ctx.project_root.join(path))?))
}
