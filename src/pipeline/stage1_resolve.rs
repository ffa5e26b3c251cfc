use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{LayoutConfig, NamePattern};
use crate::input::{InputError, Table, find_metadata_table, read_table};
use crate::model::records::{ID_COLUMN, model_records, native_records, version_column};
use crate::model::{
    ChainMapping, EvaluationTriple, ModelRecord, NativeRecord, PairKey, StructureFormat,
};
use crate::report::ReportError;
use crate::report::table::write_csv_atomic;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("no native structure metadata for target(s): {}", .ids.join(", "))]
    MissingNative { ids: Vec<String> },
    #[error("{key}: {role} structure file not found: {}", .path.display())]
    MissingStructure {
        key: PairKey,
        role: &'static str,
        path: PathBuf,
    },
    #[error("no PDB or CIF files found in {}", .dir.display())]
    NoStructureFiles { dir: PathBuf },
    #[error("native pattern '{pattern}' uses {{version}} but the native table has no version column")]
    VersionlessPattern { pattern: String },
    #[error("model table has no rows; nothing to evaluate")]
    NoPairs,
}

/// Joined model x native metadata, one row per evaluation pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedTable {
    pub columns: Vec<String>,
    pub rows: Vec<JoinedRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRow {
    pub key: PairKey,
    pub values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Stage1Output {
    pub joined: JoinedTable,
    pub triples: Vec<EvaluationTriple>,
    pub model_format: StructureFormat,
    pub native_format: StructureFormat,
    pub n_models: usize,
    pub n_natives: usize,
}

pub struct Stage1Inputs<'a> {
    pub models: &'a Table,
    pub natives: &'a Table,
    pub config: &'a LayoutConfig,
    pub model_format: StructureFormat,
    pub native_format: StructureFormat,
    pub scratch_dir: &'a Path,
}

/// Loads both metadata tables, detects structure formats and resolves every
/// evaluation pair. `scratch_dir` receives the per-pair report paths.
pub fn run_stage1(config: &LayoutConfig, scratch_dir: &Path) -> Result<Stage1Output, ResolveError> {
    let model_table_path = match &config.model_table {
        Some(p) => p.clone(),
        None => find_metadata_table(&config.model_dir)?,
    };
    let native_table_path = match &config.native_table {
        Some(p) => p.clone(),
        None => find_metadata_table(&config.native_dir)?,
    };
    tracing::info!(
        "metadata tables: models={}, natives={}",
        model_table_path.display(),
        native_table_path.display()
    );

    let models = read_table(&model_table_path)?;
    let natives = read_table(&native_table_path)?;

    let model_format = detect_format(&config.model_dir)?;
    let native_format = detect_format(&config.native_dir)?;
    tracing::info!(
        "structure formats: models={}, natives={}",
        model_format,
        native_format
    );

    resolve(&Stage1Inputs {
        models: &models,
        natives: &natives,
        config,
        model_format,
        native_format,
        scratch_dir,
    })
}

/// `.pdb` wins over `.cif`; a directory with neither fails the run.
pub fn detect_format(dir: &Path) -> Result<StructureFormat, ResolveError> {
    let mut has_cif = false;
    for entry in fs::read_dir(dir).map_err(InputError::from)? {
        let path = entry.map_err(InputError::from)?.path();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("pdb") => return Ok(StructureFormat::Pdb),
            Some(ext) if ext.eq_ignore_ascii_case("cif") => has_cif = true,
            _ => {}
        }
    }
    if has_cif {
        Ok(StructureFormat::Cif)
    } else {
        Err(ResolveError::NoStructureFiles {
            dir: dir.to_path_buf(),
        })
    }
}

pub fn resolve(inputs: &Stage1Inputs<'_>) -> Result<Stage1Output, ResolveError> {
    let config = inputs.config;
    let version_col = version_column(inputs.natives, config.version_column.as_deref())?;
    let models = model_records(inputs.models)?;
    let natives = native_records(inputs.natives, version_col)?;
    if models.is_empty() {
        return Err(ResolveError::NoPairs);
    }

    let native_pattern = config.layout.native_pattern(version_col.is_some());
    if native_pattern.uses_version() && version_col.is_none() {
        return Err(ResolveError::VersionlessPattern {
            pattern: native_pattern.as_str().to_string(),
        });
    }
    if version_col.is_some() && !native_pattern.uses_version() {
        tracing::warn!(
            "native table has a version column but pattern '{}' ignores it; all versions of a target share one native file",
            native_pattern.as_str()
        );
    }

    let mut by_id: BTreeMap<&str, Vec<&NativeRecord>> = BTreeMap::new();
    for native in &natives {
        by_id.entry(native.id.as_str()).or_default().push(native);
    }

    let mut missing = Vec::new();
    let mut seen_missing = HashSet::new();
    for model in &models {
        if !by_id.contains_key(model.id.as_str()) && seen_missing.insert(model.id.as_str()) {
            missing.push(model.id.clone());
        }
    }
    if !missing.is_empty() {
        return Err(ResolveError::MissingNative { ids: missing });
    }

    let model_ids = models.iter().map(|m| m.id.as_str()).collect::<HashSet<_>>();
    for id in by_id.keys().filter(|id| !model_ids.contains(*id)) {
        tracing::warn!("target {id} has native metadata but no models; ignored");
    }

    let layout = JoinLayout::new(inputs.models, inputs.natives);
    let mut rows = Vec::new();
    let mut triples = Vec::new();
    for model in &models {
        for native in &by_id[model.id.as_str()] {
            let key = PairKey::new(model.id.clone(), model.rank, native.version.clone());
            let triple = build_triple(inputs, &native_pattern, model, native, key.clone())?;
            rows.push(JoinedRow {
                key,
                values: layout.row(inputs.models, model.row, inputs.natives, native.row),
            });
            triples.push(triple);
        }
    }

    tracing::info!(
        "resolved {} evaluation pairs from {} models and {} natives",
        triples.len(),
        models.len(),
        natives.len()
    );

    Ok(Stage1Output {
        joined: JoinedTable {
            columns: layout.columns,
            rows,
        },
        triples,
        model_format: inputs.model_format,
        native_format: inputs.native_format,
        n_models: models.len(),
        n_natives: natives.len(),
    })
}

fn build_triple(
    inputs: &Stage1Inputs<'_>,
    native_pattern: &NamePattern,
    model: &ModelRecord,
    native: &NativeRecord,
    key: PairKey,
) -> Result<EvaluationTriple, ResolveError> {
    let config = inputs.config;
    let model_stem = config
        .layout
        .model_pattern
        .render(&model.id, Some(model.rank), None)
        .ok_or_else(|| ResolveError::VersionlessPattern {
            pattern: config.layout.model_pattern.as_str().to_string(),
        })?;
    let native_stem = native_pattern
        .render(&native.id, None, native.version.as_deref())
        .ok_or_else(|| ResolveError::VersionlessPattern {
            pattern: native_pattern.as_str().to_string(),
        })?;

    let model_path = config
        .model_dir
        .join(format!("{model_stem}.{}", inputs.model_format.extension()));
    let native_path = config
        .native_dir
        .join(format!("{native_stem}.{}", inputs.native_format.extension()));

    if !model_path.is_file() {
        return Err(ResolveError::MissingStructure {
            key,
            role: "model",
            path: model_path,
        });
    }
    if !native_path.is_file() {
        return Err(ResolveError::MissingStructure {
            key,
            role: "native",
            path: native_path,
        });
    }

    Ok(EvaluationTriple {
        report_path: inputs.scratch_dir.join(format!("{}.json", key.file_stem())),
        key,
        model_path,
        native_path,
        mapping: ChainMapping::new(model.chains.clone(), native.chains.clone()),
    })
}

/// Column layout of a left join of models onto natives by `id`.
///
/// Model columns come first, then native columns other than `id`. Any
/// other name present on both sides gets a `_model` / `_native` suffix.
struct JoinLayout {
    columns: Vec<String>,
    native_cols: Vec<usize>,
}

impl JoinLayout {
    fn new(models: &Table, natives: &Table) -> Self {
        let shared = |name: &str| {
            name != ID_COLUMN && models.has_column(name) && natives.has_column(name)
        };

        let mut columns = Vec::with_capacity(models.columns.len() + natives.columns.len());
        for name in &models.columns {
            if shared(name) {
                columns.push(format!("{name}_model"));
            } else {
                columns.push(name.clone());
            }
        }
        let mut native_cols = Vec::new();
        for (idx, name) in natives.columns.iter().enumerate() {
            if name == ID_COLUMN {
                continue;
            }
            native_cols.push(idx);
            if shared(name) {
                columns.push(format!("{name}_native"));
            } else {
                columns.push(name.clone());
            }
        }
        Self {
            columns,
            native_cols,
        }
    }

    fn row(
        &self,
        models: &Table,
        model_row: usize,
        natives: &Table,
        native_row: usize,
    ) -> Vec<String> {
        let mut values = Vec::with_capacity(self.columns.len());
        for col in 0..models.columns.len() {
            values.push(models.value(model_row, col).to_string());
        }
        for &col in &self.native_cols {
            values.push(natives.value(native_row, col).to_string());
        }
        values
    }
}

/// Writes the joined rows plus the path bookkeeping columns for debugging.
pub fn write_debug_table(output: &Stage1Output, path: &Path) -> Result<(), ReportError> {
    let mut header = output.joined.columns.clone();
    header.extend(["model_path", "native_path", "json_path"].map(str::to_string));
    let rows = output
        .joined
        .rows
        .iter()
        .zip(&output.triples)
        .map(|(row, triple)| {
            let mut values = row.values.clone();
            values.push(triple.model_path.display().to_string());
            values.push(triple.native_path.display().to_string());
            values.push(triple.report_path.display().to_string());
            values
        });
    write_csv_atomic(path, &header, rows)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_resolve.rs"]
mod tests;
