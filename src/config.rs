use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_MODEL_PATTERN: &str = "{id}_{rank}";
pub const DEFAULT_NATIVE_PATTERN: &str = "{id}";
pub const DEFAULT_VERSIONED_NATIVE_PATTERN: &str = "{id}_{version}";
pub const DEFAULT_SCORER: &str = "DockQ";
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_TARGET: &str = "dockq";
pub const DEFAULT_METRICS: &str = "pearson,spearman";
pub const DEFAULT_FEATURES: &str = "ptm,plddt,iptm";
pub const DEFAULT_METHODS: &str = "all,rank1,best_dockq";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern '{pattern}': unknown placeholder '{{{name}}}' (use {{id}}, {{rank}}, {{version}})")]
    UnknownPlaceholder { pattern: String, name: String },
    #[error("pattern '{pattern}': unbalanced braces")]
    Unbalanced { pattern: String },
    #[error("pattern '{pattern}' must contain {{{required}}}")]
    MissingPlaceholder {
        pattern: String,
        required: &'static str,
    },
    #[error("pattern '{pattern}' may not contain {{{forbidden}}}")]
    ForbiddenPlaceholder {
        pattern: String,
        forbidden: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Id,
    Rank,
    Version,
}

/// File stem template with `{id}`, `{rank}` and `{version}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl NamePattern {
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(PatternError::Unbalanced {
                            pattern: raw.to_string(),
                        });
                    }
                    let seg = match name.as_str() {
                        "id" => Segment::Id,
                        "rank" => Segment::Rank,
                        "version" => Segment::Version,
                        _ => {
                            return Err(PatternError::UnknownPlaceholder {
                                pattern: raw.to_string(),
                                name,
                            });
                        }
                    };
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(seg);
                }
                '}' => {
                    return Err(PatternError::Unbalanced {
                        pattern: raw.to_string(),
                    });
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Pattern for predicted models: needs `{id}` and `{rank}`, never `{version}`.
    pub fn for_models(raw: &str) -> Result<Self, PatternError> {
        let pattern = Self::parse(raw)?;
        pattern.require(Segment::Id, "id")?;
        pattern.require(Segment::Rank, "rank")?;
        pattern.forbid(Segment::Version, "version")?;
        Ok(pattern)
    }

    /// Pattern for natives: needs `{id}`, never `{rank}`.
    pub fn for_natives(raw: &str) -> Result<Self, PatternError> {
        let pattern = Self::parse(raw)?;
        pattern.require(Segment::Id, "id")?;
        pattern.forbid(Segment::Rank, "rank")?;
        Ok(pattern)
    }

    fn require(&self, seg: Segment, name: &'static str) -> Result<(), PatternError> {
        if self.segments.contains(&seg) {
            Ok(())
        } else {
            Err(PatternError::MissingPlaceholder {
                pattern: self.raw.clone(),
                required: name,
            })
        }
    }

    fn forbid(&self, seg: Segment, name: &'static str) -> Result<(), PatternError> {
        if self.segments.contains(&seg) {
            Err(PatternError::ForbiddenPlaceholder {
                pattern: self.raw.clone(),
                forbidden: name,
            })
        } else {
            Ok(())
        }
    }

    /// `{id}_{rank}`, built without parsing.
    pub fn default_models() -> Self {
        Self {
            raw: DEFAULT_MODEL_PATTERN.to_string(),
            segments: vec![Segment::Id, Segment::Literal("_".to_string()), Segment::Rank],
        }
    }

    /// `{id}_{version}` for versioned natives, `{id}` otherwise.
    pub fn default_natives(versioned: bool) -> Self {
        if versioned {
            Self {
                raw: DEFAULT_VERSIONED_NATIVE_PATTERN.to_string(),
                segments: vec![Segment::Id, Segment::Literal("_".to_string()), Segment::Version],
            }
        } else {
            Self {
                raw: DEFAULT_NATIVE_PATTERN.to_string(),
                segments: vec![Segment::Id],
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn uses_version(&self) -> bool {
        self.segments.contains(&Segment::Version)
    }

    /// Renders the stem. Returns `None` when `{version}` is used without one.
    pub fn render(&self, id: &str, rank: Option<u32>, version: Option<&str>) -> Option<String> {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Id => out.push_str(id),
                Segment::Rank => out.push_str(&rank?.to_string()),
                Segment::Version => out.push_str(version?),
            }
        }
        Some(out)
    }
}

/// File naming inside the model and native directories.
///
/// A `None` native pattern is chosen per run: `{id}_{version}` when the
/// native table carries a version discriminator, `{id}` otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutConvention {
    pub model_pattern: NamePattern,
    pub native_pattern: Option<NamePattern>,
}

impl Default for LayoutConvention {
    fn default() -> Self {
        Self {
            model_pattern: NamePattern::default_models(),
            native_pattern: None,
        }
    }
}

impl LayoutConvention {
    pub fn native_pattern(&self, versioned: bool) -> NamePattern {
        match &self.native_pattern {
            Some(p) => p.clone(),
            None => NamePattern::default_natives(versioned),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutConfig {
    pub model_dir: PathBuf,
    pub native_dir: PathBuf,
    pub output_dir: PathBuf,
    pub model_table: Option<PathBuf>,
    pub native_table: Option<PathBuf>,
    pub version_column: Option<String>,
    pub layout: LayoutConvention,
}

impl LayoutConfig {
    pub fn new(model_dir: PathBuf, native_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            model_dir,
            native_dir,
            output_dir,
            model_table: None,
            native_table: None,
            version_column: None,
            layout: LayoutConvention::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScorerConfig {
    pub program: PathBuf,
    pub leading_args: Vec<String>,
    pub timeout: Duration,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_SCORER),
            leading_args: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationConfig {
    pub methods: Vec<String>,
    pub metrics: Vec<String>,
    pub features: Vec<String>,
    pub target: String,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            methods: split_list(DEFAULT_METHODS),
            metrics: split_list(DEFAULT_METRICS),
            features: split_list(DEFAULT_FEATURES),
            target: DEFAULT_TARGET.to_string(),
        }
    }
}

/// Splits a comma-separated option value, dropping empty items.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "../tests/src_inline/config.rs"]
mod tests;
