use std::fmt;
use std::path::PathBuf;

/// Identity of one (model, native-version) evaluation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    pub id: String,
    pub rank: u32,
    pub version: Option<String>,
}

impl PairKey {
    pub fn new(id: impl Into<String>, rank: u32, version: Option<String>) -> Self {
        Self {
            id: id.into(),
            rank,
            version,
        }
    }

    /// File stem used for per-pair scratch artifacts.
    pub fn file_stem(&self) -> String {
        match &self.version {
            Some(v) => format!("{}_{}_{}", self.id, self.rank, v),
            None => format!("{}_{}", self.id, self.rank),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target {} rank {}", self.id, self.rank)?;
        if let Some(v) = &self.version {
            write!(f, " version {v}")?;
        }
        Ok(())
    }
}

/// Chain correspondence handed to the comparator as `<model>:<native>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainMapping {
    pub model: String,
    pub native: String,
}

impl ChainMapping {
    pub fn new(model: impl Into<String>, native: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            native: native.into(),
        }
    }

    /// Key of the native chain group inside a DockQ `best_result` block.
    pub fn native_group_key(&self) -> String {
        self.native
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect()
    }
}

impl fmt::Display for ChainMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.model, self.native)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationTriple {
    pub key: PairKey,
    pub model_path: PathBuf,
    pub native_path: PathBuf,
    pub report_path: PathBuf,
    pub mapping: ChainMapping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureFormat {
    Pdb,
    Cif,
}

impl StructureFormat {
    pub fn extension(self) -> &'static str {
        match self {
            StructureFormat::Pdb => "pdb",
            StructureFormat::Cif => "cif",
        }
    }
}

impl fmt::Display for StructureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
