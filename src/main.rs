mod comparator;
mod config;
mod input;
mod logging;
mod model;
mod pipeline;
mod report;
mod stats;

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use thiserror::Error;

use crate::comparator::DockQCommand;
use crate::config::{
    CorrelationConfig, DEFAULT_FEATURES, DEFAULT_METHODS, DEFAULT_METRICS, DEFAULT_SCORER,
    DEFAULT_TARGET, DEFAULT_TIMEOUT_SECS, LayoutConfig, LayoutConvention, NamePattern,
    PatternError, ScorerConfig, split_list,
};
use crate::input::{InputError, StructureRole, resolve_structure_dir};
use crate::pipeline::{DockqRun, PipelineError, run_correlation, run_dockq_benchmark};

#[derive(Debug, Parser)]
#[command(
    name = "kira-dockqbench",
    version,
    about = "Compute DockQ as ground truth and correlate model confidence with it."
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score every model against its native structure(s) with DockQ.
    Dockq(DockqArgs),
    /// Correlate confidence features with DockQ.
    Correlation(CorrelationArgs),
}

#[derive(Debug, Args)]
struct DockqArgs {
    /// Model directory, or the .tar it was extracted from.
    #[arg(long, alias = "data.models")]
    models: PathBuf,
    /// Native directory, or the .tar it was extracted from.
    #[arg(long, alias = "data.natives")]
    natives: PathBuf,
    /// Directory receiving <name>.dockq.csv and its run summary.
    #[arg(long, alias = "output_dir")]
    output_dir: PathBuf,
    /// Name of the modeling method.
    #[arg(long, default_value = "AFMultimer")]
    name: String,
    /// Model metadata table; defaults to the first CSV in the model directory.
    #[arg(long)]
    models_table: Option<PathBuf>,
    /// Native metadata table; defaults to the first CSV in the native directory.
    #[arg(long)]
    natives_table: Option<PathBuf>,
    /// Model file stem template.
    #[arg(long, default_value = config::DEFAULT_MODEL_PATTERN)]
    model_pattern: String,
    /// Native file stem template [default: {id}, or {id}_{version} with versions].
    #[arg(long)]
    native_pattern: Option<String>,
    /// Native version column [default: pdb_id or version when present].
    #[arg(long)]
    version_column: Option<String>,
    /// Scorer executable.
    #[arg(long, default_value = DEFAULT_SCORER)]
    scorer: PathBuf,
    /// Extra argument placed before the structure paths (repeatable).
    #[arg(long = "scorer-arg", allow_hyphen_values = true)]
    scorer_args: Vec<String>,
    /// Per-pair wall-clock limit in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
    /// Pairs scored concurrently.
    #[arg(long, default_value_t = 1)]
    jobs: usize,
    /// Also write the joined input table with file paths.
    #[arg(long)]
    debug_table: bool,
}

#[derive(Debug, Args)]
struct CorrelationArgs {
    /// Enriched table with feature columns and the target column.
    #[arg(long, alias = "metrics.dockq")]
    input: PathBuf,
    /// Directory receiving <name>.correlation.csv.
    #[arg(long, alias = "output_dir")]
    output_dir: PathBuf,
    /// Name of the modeling method.
    #[arg(long, default_value = "AFMultimer")]
    name: String,
    /// Comma-separated correlation metrics (pearson, spearman).
    #[arg(long, default_value = DEFAULT_METRICS)]
    metrics: String,
    /// Comma-separated feature columns.
    #[arg(long, default_value = DEFAULT_FEATURES)]
    features: String,
    /// Comma-separated method subsets (all, rank1, best_dockq).
    #[arg(long, default_value = DEFAULT_METHODS)]
    methods: String,
    /// Quality target column.
    #[arg(long, default_value = DEFAULT_TARGET)]
    target: String,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("--jobs must be at least 1")]
    ZeroJobs,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    if let Err(err) = run(cli.command) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), AppError> {
    match command {
        Command::Dockq(args) => {
            let (run, scorer) = dockq_config(args)?;
            let comparator = DockQCommand::from_config(&scorer);
            let out = run_dockq_benchmark(&run, &comparator)?;
            tracing::info!(
                "DockQ calculation completed: {} pairs, {} scored, {} failed; table {}, summary {}",
                out.n_pairs,
                out.n_scored,
                out.n_failed,
                out.table_path.display(),
                out.summary_path.display()
            );
        }
        Command::Correlation(args) => {
            let config = correlation_config(&args);
            let out = run_correlation(&args.input, &args.output_dir, &args.name, &config)?;
            tracing::info!(
                "correlation results ({} rows) saved to {}",
                out.n_rows,
                out.report_path.display()
            );
        }
    }
    Ok(())
}

fn dockq_config(args: DockqArgs) -> Result<(DockqRun, ScorerConfig), AppError> {
    if args.jobs == 0 {
        return Err(AppError::ZeroJobs);
    }
    let model_dir = resolve_structure_dir(&args.models, StructureRole::Models)?;
    let native_dir = resolve_structure_dir(&args.natives, StructureRole::Natives)?;

    let layout = LayoutConvention {
        model_pattern: NamePattern::for_models(&args.model_pattern)?,
        native_pattern: args
            .native_pattern
            .as_deref()
            .map(NamePattern::for_natives)
            .transpose()?,
    };
    let mut config = LayoutConfig::new(model_dir, native_dir, args.output_dir);
    config.model_table = args.models_table;
    config.native_table = args.natives_table;
    config.version_column = args.version_column;
    config.layout = layout;

    let scorer = ScorerConfig {
        program: args.scorer,
        leading_args: args.scorer_args,
        timeout: Duration::from_secs(args.timeout_secs),
    };
    let run = DockqRun {
        layout: config,
        name: args.name,
        jobs: args.jobs,
        debug_table: args.debug_table,
    };
    Ok((run, scorer))
}

fn correlation_config(args: &CorrelationArgs) -> CorrelationConfig {
    CorrelationConfig {
        methods: split_list(&args.methods),
        metrics: split_list(&args.metrics),
        features: split_list(&args.features),
        target: args.target.clone(),
    }
}

#[cfg(test)]
#[path = "../tests/src_inline/main_inline.rs"]
mod tests;

#[cfg(test)]
#[path = "../tests/src_inline/testing.rs"]
mod testing;
