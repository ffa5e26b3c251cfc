pub mod stage1_resolve;
pub mod stage2_score;
pub mod stage3_aggregate;
pub mod stage4_correlate;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::comparator::StructuralComparator;
use crate::config::{CorrelationConfig, LayoutConfig};
use crate::input::{InputError, read_table};
use crate::report::ReportError;
use crate::report::json::write_json_atomic;
use stage1_resolve::{ResolveError, run_stage1, write_debug_table};
use stage2_score::run_stage2;
use stage3_aggregate::{
    AggregateError, RunSummary, ScratchDir, aggregate, failure_entries, mean_dockq,
    write_enriched_table,
};
use stage4_correlate::{CorrelationError, correlate, write_correlation_report};

pub const TOOL_NAME: &str = "kira-dockqbench";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error(transparent)]
    Correlation(#[from] CorrelationError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

#[derive(Debug, Clone)]
pub struct DockqRun {
    pub layout: LayoutConfig,
    pub name: String,
    pub jobs: usize,
    pub debug_table: bool,
}

#[derive(Debug, Clone)]
pub struct DockqRunOutput {
    pub table_path: PathBuf,
    pub summary_path: PathBuf,
    pub n_pairs: usize,
    pub n_scored: usize,
    pub n_failed: usize,
}

pub fn dockq_table_path(output_dir: &Path, name: &str) -> PathBuf {
    output_dir.join(format!("{name}.dockq.csv"))
}

pub fn summary_path(output_dir: &Path, name: &str) -> PathBuf {
    output_dir.join(format!("{name}.dockq.summary.json"))
}

pub fn debug_table_path(output_dir: &Path, name: &str) -> PathBuf {
    output_dir.join(format!("{name}.dockq_input.csv"))
}

pub fn correlation_table_path(output_dir: &Path, name: &str) -> PathBuf {
    output_dir.join(format!("{name}.correlation.csv"))
}

/// Stage (a): resolve pairs, score them and persist the enriched table.
///
/// Outputs are written only after every pair is scored. The enriched table
/// goes last; if any write fails, the outputs of this run are removed.
pub fn run_dockq_benchmark(
    run: &DockqRun,
    comparator: &dyn StructuralComparator,
) -> Result<DockqRunOutput, PipelineError> {
    let output_dir = &run.layout.output_dir;
    let scratch = ScratchDir::new_in(output_dir)?;

    let stage1 = run_stage1(&run.layout, scratch.path())?;
    let scored = run_stage2(comparator, &stage1.triples, run.jobs).map_err(AggregateError::from)?;
    let enriched = aggregate(&stage1.joined, scored)?;

    let summary = RunSummary {
        tool: TOOL_NAME.to_string(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        name: run.name.clone(),
        comparator: comparator.name().to_string(),
        model_format: stage1.model_format.to_string(),
        native_format: stage1.native_format.to_string(),
        n_models: stage1.n_models,
        n_natives: stage1.n_natives,
        n_pairs: enriched.rows.len(),
        n_scored: enriched.n_scored(),
        n_failed: enriched.n_failed(),
        dockq_mean: mean_dockq(&enriched),
        failures: failure_entries(&enriched),
    };

    let mut pending = PendingOutputs::default();
    if run.debug_table {
        let path = debug_table_path(output_dir, &run.name);
        write_debug_table(&stage1, &path)?;
        pending.push(&path);
        tracing::info!("wrote debug input table {}", path.display());
    }
    let summary_path = summary_path(output_dir, &run.name);
    write_json_atomic(&summary_path, &summary)?;
    pending.push(&summary_path);
    let table_path = dockq_table_path(output_dir, &run.name);
    write_enriched_table(&enriched, &table_path)?;
    pending.commit();

    scratch.close();

    Ok(DockqRunOutput {
        table_path,
        summary_path,
        n_pairs: summary.n_pairs,
        n_scored: summary.n_scored,
        n_failed: summary.n_failed,
    })
}

/// Output files written so far by a run; removed on drop unless committed.
#[derive(Debug, Default)]
struct PendingOutputs(Vec<PathBuf>);

impl PendingOutputs {
    fn push(&mut self, path: &Path) {
        self.0.push(path.to_path_buf());
    }

    fn commit(mut self) {
        self.0.clear();
    }
}

impl Drop for PendingOutputs {
    fn drop(&mut self) {
        for path in self.0.drain(..) {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("could not remove partial output {}: {e}", path.display());
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorrelationRunOutput {
    pub report_path: PathBuf,
    pub n_rows: usize,
}

/// Stage (b): correlate confidence features with the quality target.
pub fn run_correlation(
    input: &Path,
    output_dir: &Path,
    name: &str,
    config: &CorrelationConfig,
) -> Result<CorrelationRunOutput, PipelineError> {
    let table = read_table(input)?;
    tracing::info!(
        "loaded {} rows and {} columns from {}",
        table.n_rows(),
        table.columns.len(),
        input.display()
    );
    let rows = correlate(&table, config)?;
    let n_undefined = rows.iter().filter(|r| r.is_undefined()).count();
    if n_undefined > 0 {
        tracing::info!("{n_undefined} of {} correlation rows are undefined", rows.len());
    }
    let report_path = correlation_table_path(output_dir, name);
    write_correlation_report(&rows, &report_path)?;
    Ok(CorrelationRunOutput {
        report_path,
        n_rows: rows.len(),
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/mod.rs"]
mod tests;
