use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::error::{MatchError, Result};
use crate::search::hybrid::RankedResult;

#[derive(Serialize)]
pub struct RobotResponse<T> {
    pub status: RobotStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub data: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Ok,
    Error { code: String, message: String },
}

pub fn robot_ok<T: Serialize>(data: T) -> RobotResponse<T> {
    RobotResponse {
        status: RobotStatus::Ok,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data,
        warnings: Vec::new(),
    }
}

#[must_use]
pub fn robot_error(err: &MatchError) -> RobotResponse<serde_json::Value> {
    RobotResponse {
        status: RobotStatus::Error {
            code: err.code().to_string(),
            message: err.user_message(),
        },
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data: serde_json::Value::Null,
        warnings: Vec::new(),
    }
}

pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)?;
    println!("{payload}");
    Ok(())
}

/// Line-oriented builder for human output.
pub struct HumanLayout {
    lines: Vec<String>,
    key_width: usize,
}

impl Default for HumanLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanLayout {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            key_width: 18,
        }
    }

    pub fn title(&mut self, text: &str) -> &mut Self {
        self.lines.push(text.bold().to_string());
        self.lines.push(String::new());
        self
    }

    pub fn kv(&mut self, key: &str, value: &str) -> &mut Self {
        self.lines.push(format!(
            "{:width$} {value}",
            key.dimmed(),
            width = self.key_width
        ));
        self
    }

    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    #[must_use]
    pub fn build(&self) -> String {
        self.lines.join("\n")
    }
}

pub fn emit_human(layout: &HumanLayout) {
    println!("{}", layout.build());
}

/// `pass`/`FAIL` marker for a constraint check.
#[must_use]
pub fn check_mark(passed: bool) -> String {
    if passed {
        "pass".green().to_string()
    } else {
        "FAIL".red().bold().to_string()
    }
}

/// Overall score coloured by band.
#[must_use]
pub fn score_badge(score: u8) -> String {
    let text = format!("{score:>3}");
    match score {
        70..=100 => text.green().bold().to_string(),
        40..=69 => text.yellow().to_string(),
        _ => text.red().to_string(),
    }
}

/// One line per ranked result.
#[must_use]
pub fn ranked_line(result: &RankedResult) -> String {
    let detail = result.match_score.as_ref().map_or_else(String::new, |score| {
        format!(
            "{}  resume {:>6.2}  video {:>6.2}  constraints {:>6.2}",
            score_badge(score.overall),
            score.resume_match,
            score.video_match,
            score.constraint_match
        )
    });
    format!(
        "{:>3}. {:<24} {:>10.4}  {detail}",
        result.rank,
        result.id.cyan(),
        result.score
    )
}
