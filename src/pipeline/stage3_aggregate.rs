use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tempfile::TempDir;
use thiserror::Error;

use crate::comparator::ComparatorError;
use crate::model::{PairKey, ScoreOutcome, ScoreReport};
use crate::pipeline::stage1_resolve::JoinedTable;
use crate::pipeline::stage2_score::ScoredPair;
use crate::report::table::write_csv_atomic;
use crate::report::{ReportError, format_score};

pub const SCORE_COLUMNS: [&str; 4] = ["dockq", "irmsd", "lrmsd", "fnat"];

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("failed to create scratch directory in {dir}: {source}")]
    Scratch {
        dir: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Comparator(#[from] ComparatorError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("{0}: no score outcome was produced")]
    MissingOutcome(PairKey),
    #[error("{0}: score outcome does not match any resolved pair")]
    UnknownPair(PairKey),
}

/// Scratch space for per-pair comparator reports. Removed on drop, including
/// on error or panic.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn new_in(parent: &Path) -> Result<Self, AggregateError> {
        let scratch_err = |source| AggregateError::Scratch {
            dir: parent.display().to_string(),
            source,
        };
        std::fs::create_dir_all(parent).map_err(scratch_err)?;
        let dir = tempfile::Builder::new()
            .prefix(".dockq-scratch-")
            .tempdir_in(parent)
            .map_err(scratch_err)?;
        tracing::debug!("scratch directory {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn close(self) {
        let path = self.dir.path().display().to_string();
        if let Err(e) = self.dir.close() {
            tracing::warn!("could not remove scratch directory {path}: {e}");
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub key: PairKey,
    pub values: Vec<String>,
    pub outcome: ScoreOutcome,
}

/// Joined metadata with one score outcome per row.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedTable {
    pub columns: Vec<String>,
    pub rows: Vec<EnrichedRow>,
}

impl EnrichedTable {
    pub fn n_scored(&self) -> usize {
        self.rows.iter().filter(|r| r.outcome.report().is_some()).count()
    }

    pub fn n_failed(&self) -> usize {
        self.rows.len() - self.n_scored()
    }

    pub fn header(&self) -> Vec<String> {
        let mut header = self.columns.clone();
        header.extend(SCORE_COLUMNS.map(str::to_string));
        header
    }

    /// Output cells; scores are rounded here and nowhere earlier.
    pub fn cells(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows.iter().map(|row| {
            let report = row.outcome.report();
            let mut values = row.values.clone();
            values.push(format_score(report.map(|r| r.dockq)));
            values.push(format_score(report.and_then(|r| r.irmsd)));
            values.push(format_score(report.and_then(|r| r.lrmsd)));
            values.push(format_score(report.and_then(|r| r.fnat)));
            values
        })
    }
}

/// Folds score outcomes back onto the joined rows by pair identity.
pub fn aggregate(
    joined: &JoinedTable,
    scored: Vec<ScoredPair>,
) -> Result<EnrichedTable, AggregateError> {
    let mut by_key: HashMap<PairKey, ScoreOutcome> = HashMap::with_capacity(scored.len());
    for pair in scored {
        by_key.insert(pair.key, pair.outcome);
    }

    let kept = joined
        .columns
        .iter()
        .enumerate()
        .filter(|(_, name)| {
            let clash = SCORE_COLUMNS.contains(&name.as_str());
            if clash {
                tracing::warn!("input column '{name}' is replaced by the computed score");
            }
            !clash
        })
        .map(|(idx, _)| idx)
        .collect::<Vec<_>>();
    let columns = kept.iter().map(|&i| joined.columns[i].clone()).collect();

    let mut rows = Vec::with_capacity(joined.rows.len());
    for row in &joined.rows {
        let outcome = by_key
            .remove(&row.key)
            .ok_or_else(|| AggregateError::MissingOutcome(row.key.clone()))?;
        rows.push(EnrichedRow {
            key: row.key.clone(),
            values: kept.iter().map(|&i| row.values[i].clone()).collect(),
            outcome,
        });
    }
    if let Some(extra) = by_key.into_keys().min() {
        return Err(AggregateError::UnknownPair(extra));
    }

    Ok(EnrichedTable { columns, rows })
}

pub fn write_enriched_table(table: &EnrichedTable, path: &Path) -> Result<(), AggregateError> {
    write_csv_atomic(path, &table.header(), table.cells())?;
    tracing::info!(
        "wrote {} rows ({} scored, {} absent) to {}",
        table.rows.len(),
        table.n_scored(),
        table.n_failed(),
        path.display()
    );
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureEntry {
    pub id: String,
    pub rank: u32,
    pub version: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub tool: String,
    pub tool_version: String,
    pub name: String,
    pub comparator: String,
    pub model_format: String,
    pub native_format: String,
    pub n_models: usize,
    pub n_natives: usize,
    pub n_pairs: usize,
    pub n_scored: usize,
    pub n_failed: usize,
    pub dockq_mean: Option<f64>,
    pub failures: Vec<FailureEntry>,
}

pub fn failure_entries(table: &EnrichedTable) -> Vec<FailureEntry> {
    table
        .rows
        .iter()
        .filter_map(|row| {
            row.outcome.failure().map(|f| FailureEntry {
                id: row.key.id.clone(),
                rank: row.key.rank,
                version: row.key.version.clone(),
                reason: f.to_string(),
            })
        })
        .collect()
}

pub fn mean_dockq(table: &EnrichedTable) -> Option<f64> {
    let scores = table
        .rows
        .iter()
        .filter_map(|r| r.outcome.report().map(|s: &ScoreReport| s.dockq))
        .collect::<Vec<_>>();
    if scores.is_empty() {
        None
    } else {
        Some(crate::report::round3(scores.iter().sum::<f64>() / scores.len() as f64))
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_aggregate.rs"]
mod tests;
