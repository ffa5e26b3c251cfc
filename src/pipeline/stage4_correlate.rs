use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use crate::config::CorrelationConfig;
use crate::input::table::parse_float;
use crate::input::{InputError, Table};
use crate::model::records::{ID_COLUMN, RANK_COLUMN, parse_rank};
use crate::model::{CorrelationRow, MethodSubset, StatisticKind};
use crate::report::table::write_csv_atomic;
use crate::report::{ReportError, format_statistic, round3};
use crate::stats::{self, MIN_SAMPLES, is_constant};

pub const REPORT_COLUMNS: [&str; 5] = ["method", "feature", "metric", "r", "p_value"];

#[derive(Debug, Error)]
pub enum CorrelationError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("target column '{0}' not in table")]
    MissingTarget(String),
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Computes the correlation report for every configured subset.
///
/// Rows whose target is absent are left out of every sample. Unknown subset
/// or statistic names, undersized subsets and missing feature columns are
/// logged and skipped; an empty report is a valid result.
pub fn correlate(
    table: &Table,
    config: &CorrelationConfig,
) -> Result<Vec<CorrelationRow>, CorrelationError> {
    let target_col = table
        .column_index(&config.target)
        .ok_or_else(|| CorrelationError::MissingTarget(config.target.clone()))?;

    let kinds = parse_kinds(&config.metrics);
    let targets = (0..table.n_rows())
        .map(|row| table.float(row, target_col))
        .collect::<Vec<_>>();
    let n_absent = targets.iter().filter(|t| t.is_none()).count();
    if n_absent > 0 {
        tracing::info!(
            "{} of {} rows have no '{}' value and are excluded from every sample",
            n_absent,
            table.n_rows(),
            config.target
        );
    }

    let mut out = Vec::new();
    for name in &config.methods {
        let Some(subset) = MethodSubset::parse(name) else {
            tracing::warn!("unknown method subset '{name}'; skipped");
            continue;
        };
        let Some(rows) = select_rows(table, &targets, subset, name) else {
            continue;
        };
        if rows.len() < MIN_SAMPLES {
            tracing::warn!(
                "method '{}' resulted in only {} rows; skipping correlation computation",
                name,
                rows.len()
            );
            continue;
        }
        let missing = config
            .features
            .iter()
            .filter(|f| !table.has_column(f))
            .cloned()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            tracing::warn!(
                "method '{}' missing features: {}; skipped",
                name,
                missing.join(", ")
            );
            continue;
        }

        tracing::info!("computing correlations for method '{}' with {} rows", name, rows.len());
        let mut block = Vec::new();
        for feature in &config.features {
            let feature_col = table
                .column_index(feature)
                .ok_or_else(|| InputError::MissingColumn {
                    table: "enriched".to_string(),
                    column: feature.clone(),
                })?;
            block.extend(correlate_feature(
                table,
                &targets,
                &rows,
                name,
                feature,
                feature_col,
                &kinds,
            ));
        }
        sort_block(&mut block);
        out.extend(block);
    }

    if out.is_empty() {
        tracing::warn!("no valid correlation results computed");
    }
    Ok(out)
}

fn parse_kinds(names: &[String]) -> Vec<StatisticKind> {
    let mut kinds = Vec::new();
    for name in names {
        match StatisticKind::parse(name) {
            Some(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Some(_) => {}
            None => tracing::warn!("unknown correlation metric '{name}'; skipped"),
        }
    }
    kinds
}

/// Row indices of a subset, restricted to rows with a target value.
/// `None` when the subset cannot be formed from this table.
fn select_rows(
    table: &Table,
    targets: &[Option<f64>],
    subset: MethodSubset,
    name: &str,
) -> Option<Vec<usize>> {
    let scored = (0..table.n_rows()).filter(|&r| targets[r].is_some());
    match subset {
        MethodSubset::All => Some(scored.collect()),
        MethodSubset::TopRank => {
            let (Some(id_col), Some(rank_col)) =
                (table.column_index(ID_COLUMN), table.column_index(RANK_COLUMN))
            else {
                tracing::warn!(
                    "method '{name}' needs '{ID_COLUMN}' and '{RANK_COLUMN}' columns; skipped"
                );
                return None;
            };
            let ranks = (0..table.n_rows())
                .map(|r| parse_rank(table.value(r, rank_col)))
                .collect::<Vec<_>>();
            // best rank per target over all rows, scored or not
            let mut best: HashMap<&str, u32> = HashMap::new();
            for (row, rank) in ranks.iter().enumerate() {
                if let Some(rank) = *rank {
                    let entry = best.entry(table.value(row, id_col)).or_insert(rank);
                    *entry = (*entry).min(rank);
                }
            }
            Some(
                scored
                    .filter(|&r| {
                        ranks[r].is_some() && best.get(table.value(r, id_col)).copied() == ranks[r]
                    })
                    .collect(),
            )
        }
        MethodSubset::BestByTarget => {
            let Some(id_col) = table.column_index(ID_COLUMN) else {
                tracing::warn!("method '{name}' needs an '{ID_COLUMN}' column; skipped");
                return None;
            };
            let mut order: Vec<&str> = Vec::new();
            let mut best: HashMap<&str, usize> = HashMap::new();
            for row in scored {
                let id = table.value(row, id_col);
                match best.get(id) {
                    Some(&current) if targets[current] >= targets[row] => {}
                    Some(_) => {
                        best.insert(id, row);
                    }
                    None => {
                        order.push(id);
                        best.insert(id, row);
                    }
                }
            }
            Some(order.iter().map(|id| best[id]).collect())
        }
    }
}

fn correlate_feature(
    table: &Table,
    targets: &[Option<f64>],
    rows: &[usize],
    method: &str,
    feature: &str,
    feature_col: usize,
    kinds: &[StatisticKind],
) -> Vec<CorrelationRow> {
    let mut x = Vec::with_capacity(rows.len());
    let mut y = Vec::with_capacity(rows.len());
    for &row in rows {
        if let (Some(fx), Some(ty)) = (parse_float(table.value(row, feature_col)), targets[row]) {
            x.push(fx);
            y.push(ty);
        }
    }

    let undefined = |kind: StatisticKind| CorrelationRow {
        method: method.to_string(),
        feature: feature.to_string(),
        metric: kind,
        r: None,
        p_value: None,
    };

    if x.len() < MIN_SAMPLES {
        tracing::warn!(
            "method '{}': feature '{}' has only {} usable values; correlation undefined",
            method,
            feature,
            x.len()
        );
        return kinds.iter().map(|&k| undefined(k)).collect();
    }
    if is_constant(&x) {
        tracing::warn!(
            "method '{method}': feature '{feature}' has constant values; correlation undefined"
        );
        return kinds.iter().map(|&k| undefined(k)).collect();
    }
    if is_constant(&y) {
        tracing::warn!(
            "method '{method}': target is constant; correlation with '{feature}' undefined"
        );
        return kinds.iter().map(|&k| undefined(k)).collect();
    }

    kinds
        .iter()
        .map(|&kind| match stats::correlate(kind, &x, &y) {
            Some(c) => CorrelationRow {
                method: method.to_string(),
                feature: feature.to_string(),
                metric: kind,
                r: Some(round3(c.r)),
                p_value: Some(round3(c.p_value)),
            },
            None => {
                tracing::warn!("method '{method}': {kind} correlation for '{feature}' undefined");
                undefined(kind)
            }
        })
        .collect()
}

/// Feature ascending, metric ascending, coefficient descending; undefined
/// coefficients sort last.
fn sort_block(rows: &mut [CorrelationRow]) {
    rows.sort_by(|a, b| {
        a.feature
            .cmp(&b.feature)
            .then_with(|| a.metric.as_str().cmp(b.metric.as_str()))
            .then_with(|| match (a.r, b.r) {
                (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    });
}

pub fn write_correlation_report(
    rows: &[CorrelationRow],
    path: &Path,
) -> Result<(), CorrelationError> {
    let header = REPORT_COLUMNS.map(str::to_string);
    let cells = rows.iter().map(|row| {
        vec![
            row.method.clone(),
            row.feature.clone(),
            row.metric.as_str().to_string(),
            format_statistic(row.r),
            format_statistic(row.p_value),
        ]
    });
    write_csv_atomic(path, &header, cells)?;
    tracing::info!("wrote {} correlation rows to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_correlate.rs"]
mod tests;
