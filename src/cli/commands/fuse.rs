//! nexus-match fuse - Reciprocal Rank Fusion over result files

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Deserialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json, ranked_line, robot_ok};
use crate::error::{MatchError, Result};
use crate::search::hybrid::{RankedResult, reciprocal_rank_fusion};

#[derive(Args, Debug)]
pub struct FuseArgs {
    /// JSON files, each an array of ranked results or of ids, best first
    #[arg(required = true, num_args = 2..)]
    pub lists: Vec<PathBuf>,

    /// RRF constant (defaults to ranking.rrf_k)
    #[arg(long)]
    pub k: Option<f64>,

    /// Keep only the first N fused results
    #[arg(long, short)]
    pub top: Option<usize>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListEntry {
    Id(String),
    Result(RankedResult),
}

impl ListEntry {
    fn into_result(self) -> RankedResult {
        match self {
            Self::Id(id) => RankedResult::new(id, 0.0),
            Self::Result(result) => result,
        }
    }
}

/// Read one ranked list. Array order is the ranking; stored ranks are ignored.
pub fn read_list(path: &Path) -> Result<Vec<RankedResult>> {
    let raw = std::fs::read_to_string(path)?;
    let entries: Vec<ListEntry> = serde_json::from_str(&raw).map_err(|err| {
        MatchError::Config(format!("{}: not a ranked list: {err}", path.display()))
    })?;
    Ok(entries.into_iter().map(ListEntry::into_result).collect())
}

pub fn run(ctx: &AppContext, args: &FuseArgs) -> Result<()> {
    let lists = args
        .lists
        .iter()
        .map(|path| read_list(&ctx.project_root.join(path)))
        .collect::<Result<Vec<_>>>()?;

    let k = args.k.unwrap_or(ctx.config.ranking.rrf_k);
    let mut fused = reciprocal_rank_fusion(&lists, k);
    if let Some(top) = args.top {
        fused.truncate(top);
    }

    if ctx.robot_mode {
        return emit_json(&robot_ok(&fused));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Reciprocal Rank Fusion")
        .kv("lists", &lists.len().to_string())
        .kv("k", &k.to_string())
        .push_line(String::new());
    for result in &fused {
        layout.push_line(ranked_line(result));
    }
    emit_human(&layout);
    Ok(())
}
