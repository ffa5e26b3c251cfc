pub mod dockq;
pub mod parse;

use std::path::PathBuf;

use thiserror::Error;

use crate::model::{EvaluationTriple, ScoreOutcome};

pub use dockq::DockQCommand;

/// Error that invalidates the whole batch, as opposed to a per-pair
/// [`crate::model::ScoreFailure`].
#[derive(Debug, Error)]
pub enum ComparatorError {
    #[error("scorer program {} could not be executed: {source}", .program.display())]
    ProgramUnavailable {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{key}: IO error while scoring: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Structural comparison of one model against one native.
///
/// Implementations turn every recoverable problem with a single pair into
/// `ScoreOutcome::Failed` and reserve `Err` for conditions that would fail
/// every other pair too.
pub trait StructuralComparator: Send + Sync {
    fn name(&self) -> &str;

    fn compare(&self, triple: &EvaluationTriple) -> Result<ScoreOutcome, ComparatorError>;
}
