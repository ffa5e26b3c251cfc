use std::collections::BTreeMap;

use serde::Deserialize;

use crate::model::{ChainMapping, ScoreFailure, ScoreReport};

pub const GLOBAL_FIELD: &str = "GlobalDockQ";

#[derive(Debug, Deserialize)]
struct RawReport {
    #[serde(rename = "GlobalDockQ")]
    global_dockq: Option<f64>,
    best_result: Option<BTreeMap<String, RawGroup>>,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    #[serde(rename = "iRMSD")]
    irmsd: Option<f64>,
    #[serde(rename = "LRMSD")]
    lrmsd: Option<f64>,
    fnat: Option<f64>,
}

/// Extracts the global score plus the sub-metrics of the native chain group
/// named by `mapping`. Sub-metrics stay `None` when the group is absent.
pub fn parse_dockq_report(
    bytes: &[u8],
    mapping: &ChainMapping,
) -> Result<ScoreReport, ScoreFailure> {
    let raw: RawReport =
        serde_json::from_slice(bytes).map_err(|e| ScoreFailure::MalformedReport(e.to_string()))?;
    let dockq = raw
        .global_dockq
        .filter(|v| v.is_finite())
        .ok_or(ScoreFailure::MissingField(GLOBAL_FIELD))?;

    let key = mapping.native_group_key();
    let group = raw.best_result.as_ref().and_then(|groups| groups.get(&key));
    let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
    Ok(ScoreReport {
        dockq,
        irmsd: group.and_then(|g| finite(g.irmsd)),
        lrmsd: group.and_then(|g| finite(g.lrmsd)),
        fnat: group.and_then(|g| finite(g.fnat)),
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/comparator/parse.rs"]
mod tests;
