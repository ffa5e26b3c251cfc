use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use thiserror::Error;

pub mod table;

pub use table::{Table, read_table};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("{table} table is missing required column '{column}'")]
    MissingColumn { table: String, column: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("target {id}: invalid rank '{value}' (expected a positive integer)")]
    InvalidRank { id: String, value: String },
    #[error("target {id} rank {rank} appears more than once in the model table")]
    DuplicateModel { id: String, rank: u32 },
}

impl InputError {
    pub fn csv(path: &Path, source: csv::Error) -> Self {
        InputError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Which side of the benchmark a structure directory holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureRole {
    Models,
    Natives,
}

pub fn open_maybe_gz(path: &Path) -> Result<Box<dyn Read>, InputError> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            InputError::MissingInput(format!("{} does not exist", path.display()))
        } else {
            InputError::Io(e)
        }
    })?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Resolves a structure location given on the command line.
///
/// Directories are used as is. A `.tar` archive stands for its extracted
/// layout: models live next to the archive under its stem, natives under a
/// sibling `natives/` directory.
pub fn resolve_structure_dir(path: &Path, role: StructureRole) -> Result<PathBuf, InputError> {
    if path.is_dir() {
        return Ok(path.to_path_buf());
    }
    if path.extension().is_some_and(|ext| ext == "tar") {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let dir = match role {
            StructureRole::Models => path.with_extension(""),
            StructureRole::Natives => parent.join("natives"),
        };
        if dir.is_dir() {
            tracing::info!(
                "using extracted directory {} for archive {}",
                dir.display(),
                path.display()
            );
            return Ok(dir);
        }
        return Err(InputError::MissingInput(format!(
            "archive {} has not been extracted (expected directory {})",
            path.display(),
            dir.display()
        )));
    }
    Err(InputError::MissingInput(format!(
        "{} is neither a directory nor a .tar archive",
        path.display()
    )))
}

/// First `*.csv` / `*.csv.gz` in `dir` by file name.
pub fn find_metadata_table(dir: &Path) -> Result<PathBuf, InputError> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".csv") || name.ends_with(".csv.gz") {
            candidates.push(path);
        }
    }
    candidates.sort();
    if candidates.len() > 1 {
        tracing::warn!(
            "{} metadata tables found in {}; using {}",
            candidates.len(),
            dir.display(),
            candidates[0].display()
        );
    }
    candidates.into_iter().next().ok_or_else(|| {
        InputError::MissingInput(format!("no metadata CSV found in {}", dir.display()))
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/tests.rs"]
mod tests;
