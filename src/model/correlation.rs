use std::fmt;

/// Named filter over the enriched table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodSubset {
    All,
    TopRank,
    BestByTarget,
}

impl MethodSubset {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "all" => Some(MethodSubset::All),
            "rank1" | "top-rank" | "top_rank" => Some(MethodSubset::TopRank),
            "best_dockq" | "best-by-target" | "best_by_target" => Some(MethodSubset::BestByTarget),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StatisticKind {
    Pearson,
    Spearman,
}

impl StatisticKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pearson" => Some(StatisticKind::Pearson),
            "spearman" => Some(StatisticKind::Spearman),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatisticKind::Pearson => "pearson",
            StatisticKind::Spearman => "spearman",
        }
    }
}

impl fmt::Display for StatisticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One output row. `None` marks an undefined coefficient.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationRow {
    pub method: String,
    pub feature: String,
    pub metric: StatisticKind,
    pub r: Option<f64>,
    pub p_value: Option<f64>,
}

impl CorrelationRow {
    pub fn is_undefined(&self) -> bool {
        self.r.is_none()
    }
}
