use std::collections::HashSet;

use crate::input::{InputError, Table};

pub const ID_COLUMN: &str = "id";
pub const RANK_COLUMN: &str = "rank";
pub const CHAINS_COLUMN: &str = "chains";
pub const MODEL_CHAINS_COLUMN: &str = "chains_model";
pub const NATIVE_CHAINS_COLUMN: &str = "chains_native";
pub const VERSION_COLUMNS: [&str; 2] = ["pdb_id", "version"];

/// One predicted structure, indexed by its row in the model table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRecord {
    pub row: usize,
    pub id: String,
    pub rank: u32,
    pub chains: String,
}

/// One reference structure, indexed by its row in the native table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeRecord {
    pub row: usize,
    pub id: String,
    pub version: Option<String>,
    pub chains: String,
}

pub fn chain_column(table: &Table, preferred: &str, name: &str) -> Result<usize, InputError> {
    table
        .column_index(preferred)
        .or_else(|| table.column_index(CHAINS_COLUMN))
        .ok_or_else(|| InputError::MissingColumn {
            table: name.to_string(),
            column: format!("{preferred}' or '{CHAINS_COLUMN}"),
        })
}

/// Accepts `2` and `2.0`; anything else, including zero, is rejected.
pub fn parse_rank(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<u32>() {
        return (v > 0).then_some(v);
    }
    let v = raw.parse::<f64>().ok()?;
    if v.fract() == 0.0 && v >= 1.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}

pub fn model_records(table: &Table) -> Result<Vec<ModelRecord>, InputError> {
    let id_col = table.require_column(ID_COLUMN, "model")?;
    let rank_col = table.require_column(RANK_COLUMN, "model")?;
    let chains_col = chain_column(table, MODEL_CHAINS_COLUMN, "model")?;

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(table.n_rows());
    for row in 0..table.n_rows() {
        let id = table.value(row, id_col).to_string();
        if id.is_empty() {
            return Err(InputError::InvalidInput(format!(
                "model table row {} has an empty id",
                row + 1
            )));
        }
        let raw_rank = table.value(row, rank_col);
        let rank = parse_rank(raw_rank).ok_or_else(|| InputError::InvalidRank {
            id: id.clone(),
            value: raw_rank.to_string(),
        })?;
        if !seen.insert((id.clone(), rank)) {
            return Err(InputError::DuplicateModel { id, rank });
        }
        out.push(ModelRecord {
            row,
            id,
            rank,
            chains: table.value(row, chains_col).to_string(),
        });
    }
    Ok(out)
}

/// Picks the native version discriminator: the explicit column when given,
/// otherwise the first known discriminator column present.
pub fn version_column(table: &Table, explicit: Option<&str>) -> Result<Option<usize>, InputError> {
    match explicit {
        Some(name) => table.require_column(name, "native").map(Some),
        None => Ok(VERSION_COLUMNS
            .iter()
            .find_map(|name| table.column_index(name))),
    }
}

pub fn native_records(
    table: &Table,
    version_col: Option<usize>,
) -> Result<Vec<NativeRecord>, InputError> {
    let id_col = table.require_column(ID_COLUMN, "native")?;
    let chains_col = chain_column(table, NATIVE_CHAINS_COLUMN, "native")?;

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(table.n_rows());
    for row in 0..table.n_rows() {
        let id = table.value(row, id_col).to_string();
        if id.is_empty() {
            return Err(InputError::InvalidInput(format!(
                "native table row {} has an empty id",
                row + 1
            )));
        }
        let version = match version_col {
            Some(col) => {
                let v = table.value(row, col);
                if v.is_empty() {
                    return Err(InputError::InvalidInput(format!(
                        "target {id}: native table row {} has an empty version",
                        row + 1
                    )));
                }
                Some(v.to_string())
            }
            None => None,
        };
        if !seen.insert((id.clone(), version.clone())) {
            let what = match &version {
                Some(v) => format!("target {id} version {v}"),
                None => format!("target {id}"),
            };
            return Err(InputError::InvalidInput(format!(
                "{what} appears more than once in the native table; add a version column to disambiguate"
            )));
        }
        out.push(NativeRecord {
            row,
            id,
            version,
            chains: table.value(row, chains_col).to_string(),
        });
    }
    Ok(out)
}
