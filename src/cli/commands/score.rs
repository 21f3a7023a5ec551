//! nexus-match score - Constraint checks and fused score for one pair

use std::path::PathBuf;

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, check_mark, emit_human, emit_json, robot_ok, score_badge};
use crate::error::{MatchError, Result};
use crate::matching::constraints::ConstraintKind;
use crate::matching::corpus::CorpusSource;
use crate::matching::service::PairScore;

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Corpus file (JSON or YAML)
    #[arg(long)]
    pub corpus: PathBuf,

    /// Teacher profile id
    #[arg(long)]
    pub teacher: String,

    /// Job posting id
    #[arg(long)]
    pub job: String,
}

pub fn run(ctx: &AppContext, args: &ScoreArgs) -> Result<()> {
    let corpus = super::load_corpus(ctx, &args.corpus)?;
    let teacher = corpus
        .teacher(&args.teacher)?
        .ok_or_else(|| MatchError::NotFound(format!("teacher {}", args.teacher)))?;
    let job = corpus
        .job(&args.job)?
        .ok_or_else(|| MatchError::NotFound(format!("job {}", args.job)))?;

    let service = ctx.service(corpus)?;
    let pair = service.score_pair(&teacher, &job)?;

    if ctx.robot_mode {
        emit_json(&robot_ok(&pair))
    } else {
        emit_human(&human_layout(&pair));
        Ok(())
    }
}

fn human_layout(pair: &PairScore) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout
        .title(&format!("{} × {}", pair.teacher_id, pair.job_id))
        .kv("overall", &score_badge(pair.score.overall))
        .kv("resume", &format!("{:.2}", pair.score.resume_match))
        .kv("video", &format!("{:.2}", pair.score.video_match))
        .kv("constraints", &format!("{:.2}", pair.score.constraint_match))
        .push_line(String::new());
    for kind in ConstraintKind::ALL {
        layout.kv(kind.as_str(), &check_mark(pair.constraints.passed(kind)));
    }
    layout
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::matching::constraints::ConstraintReport;
    use crate::matching::score::{MatchScore, ScoreWeights};

    #[test]
    fn layout_lists_every_constraint() {
        colored::control::set_override(false);
        let checks = BTreeMap::from([
            (ConstraintKind::Certification, true),
            (ConstraintKind::Experience, true),
            (ConstraintKind::Visa, false),
        ]);
        let pair = PairScore {
            teacher_id: "teacher-1".to_string(),
            job_id: "job-1".to_string(),
            constraints: ConstraintReport::from_checks(checks),
            score: MatchScore::from_components(80.0, 0.0, 66.67, &ScoreWeights::default())
                .unwrap(),
        };
        let text = human_layout(&pair).build();
        assert!(text.contains("teacher-1 × job-1"));
        assert!(text.lines().any(|l| l.starts_with("visa") && l.ends_with("FAIL")));
        assert!(text.lines().any(|l| l.starts_with("experience") && l.ends_with("pass")));
    }
}
