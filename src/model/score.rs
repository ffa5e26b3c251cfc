use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Metrics pulled out of one comparator report, kept at full precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreReport {
    pub dockq: f64,
    pub irmsd: Option<f64>,
    pub lrmsd: Option<f64>,
    pub fnat: Option<f64>,
}

impl ScoreReport {
    pub fn global(dockq: f64) -> Self {
        Self {
            dockq,
            irmsd: None,
            lrmsd: None,
            fnat: None,
        }
    }
}

/// Reason a single pair could not be scored. Never aborts the batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreFailure {
    #[error("scorer exited with {}: {stderr}", exit_label(.code))]
    NonZeroExit { code: Option<i32>, stderr: String },
    #[error("scorer timed out after {limit:?}")]
    TimedOut { limit: Duration },
    #[error("scorer could not be started: {0}")]
    Spawn(String),
    #[error("scorer wrote no report at {}", .0.display())]
    MissingReport(PathBuf),
    #[error("malformed report: {0}")]
    MalformedReport(String),
    #[error("report has no '{0}' field")]
    MissingField(&'static str),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    Scored(ScoreReport),
    Failed(ScoreFailure),
}

impl ScoreOutcome {
    pub fn report(&self) -> Option<&ScoreReport> {
        match self {
            ScoreOutcome::Scored(r) => Some(r),
            ScoreOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ScoreFailure> {
        match self {
            ScoreOutcome::Scored(_) => None,
            ScoreOutcome::Failed(f) => Some(f),
        }
    }
}
