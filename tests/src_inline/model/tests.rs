use std::time::Duration;

use super::records::*;
use super::*;
use crate::input::InputError;
use crate::testing::table;

#[test]
fn test_pair_key_stem_and_display() {
    let plain = PairKey::new("7XYZ", 2, None);
    assert_eq!(plain.file_stem(), "7XYZ_2");
    assert_eq!(plain.to_string(), "target 7XYZ rank 2");

    let versioned = PairKey::new("7XYZ", 2, Some("7xyz_b".to_string()));
    assert_eq!(versioned.file_stem(), "7XYZ_2_7xyz_b");
    assert_eq!(versioned.to_string(), "target 7XYZ rank 2 version 7xyz_b");
}

#[test]
fn test_pair_key_ordering() {
    let mut keys = vec![
        PairKey::new("T2", 1, None),
        PairKey::new("T1", 10, None),
        PairKey::new("T1", 2, None),
    ];
    keys.sort();
    let ranks = keys.iter().map(|k| (k.id.as_str(), k.rank)).collect::<Vec<_>>();
    assert_eq!(ranks, vec![("T1", 2), ("T1", 10), ("T2", 1)]);
}

#[test]
fn test_chain_mapping() {
    let m = ChainMapping::new("AB", "C,D");
    assert_eq!(m.to_string(), "AB:C,D");
    assert_eq!(m.native_group_key(), "CD");
}

#[test]
fn test_structure_format_extension() {
    assert_eq!(StructureFormat::Pdb.to_string(), "pdb");
    assert_eq!(StructureFormat::Cif.extension(), "cif");
}

#[test]
fn test_parse_rank() {
    assert_eq!(parse_rank("1"), Some(1));
    assert_eq!(parse_rank(" 3 "), Some(3));
    assert_eq!(parse_rank("2.0"), Some(2));
    assert_eq!(parse_rank("0"), None);
    assert_eq!(parse_rank("-1"), None);
    assert_eq!(parse_rank("1.5"), None);
    assert_eq!(parse_rank("first"), None);
    assert_eq!(parse_rank(""), None);
}

#[test]
fn test_model_records() {
    let t = table(
        &["id", "rank", "chains", "ptm"],
        &[&["T1", "1", "AB", "0.8"], &["T1", "2.0", "AB", "0.7"]],
    );
    let records = model_records(&t).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].rank, 2);
    assert_eq!(records[1].row, 1);
    assert_eq!(records[0].chains, "AB");
}

#[test]
fn test_model_records_prefers_model_chain_column() {
    let t = table(
        &["id", "rank", "chains", "chains_model"],
        &[&["T1", "1", "XY", "AB"]],
    );
    assert_eq!(model_records(&t).unwrap()[0].chains, "AB");
}

#[test]
fn test_model_records_rejects_bad_rows() {
    let bad_rank = table(&["id", "rank", "chains"], &[&["T1", "0", "AB"]]);
    assert!(matches!(
        model_records(&bad_rank),
        Err(InputError::InvalidRank { id, value }) if id == "T1" && value == "0"
    ));

    let dup = table(
        &["id", "rank", "chains"],
        &[&["T1", "1", "AB"], &["T1", "1.0", "AB"]],
    );
    assert!(matches!(
        model_records(&dup),
        Err(InputError::DuplicateModel { id, rank: 1 }) if id == "T1"
    ));

    let no_rank = table(&["id", "chains"], &[&["T1", "AB"]]);
    assert!(matches!(
        model_records(&no_rank),
        Err(InputError::MissingColumn { column, .. }) if column == "rank"
    ));

    let empty_id = table(&["id", "rank", "chains"], &[&["", "1", "AB"]]);
    assert!(matches!(model_records(&empty_id), Err(InputError::InvalidInput(_))));
}

#[test]
fn test_version_column_detection() {
    let with_pdb = table(&["id", "chains", "pdb_id"], &[]);
    assert_eq!(version_column(&with_pdb, None).unwrap(), Some(2));

    let with_version = table(&["id", "version", "chains"], &[]);
    assert_eq!(version_column(&with_version, None).unwrap(), Some(1));

    let plain = table(&["id", "chains"], &[]);
    assert_eq!(version_column(&plain, None).unwrap(), None);

    let custom = table(&["id", "chains", "assembly"], &[]);
    assert_eq!(version_column(&custom, Some("assembly")).unwrap(), Some(2));
    assert!(version_column(&plain, Some("assembly")).is_err());
}

#[test]
fn test_native_records_versions() {
    let t = table(
        &["id", "chains", "pdb_id"],
        &[&["T1", "AB", "1abc"], &["T1", "AB", "2abc"], &["T2", "CD", "3def"]],
    );
    let records = native_records(&t, Some(2)).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[1].version.as_deref(), Some("2abc"));

    let dup = table(&["id", "chains"], &[&["T1", "AB"], &["T1", "AB"]]);
    assert!(matches!(native_records(&dup, None), Err(InputError::InvalidInput(_))));

    let blank_version = table(&["id", "chains", "pdb_id"], &[&["T1", "AB", ""]]);
    assert!(native_records(&blank_version, Some(2)).is_err());
}

#[test]
fn test_method_subset_aliases() {
    assert_eq!(MethodSubset::parse("all"), Some(MethodSubset::All));
    assert_eq!(MethodSubset::parse("rank1"), Some(MethodSubset::TopRank));
    assert_eq!(MethodSubset::parse("Top-Rank"), Some(MethodSubset::TopRank));
    assert_eq!(MethodSubset::parse("best_dockq"), Some(MethodSubset::BestByTarget));
    assert_eq!(MethodSubset::parse("best-by-target"), Some(MethodSubset::BestByTarget));
    assert_eq!(MethodSubset::parse("median"), None);
}

#[test]
fn test_statistic_kind_parse() {
    assert_eq!(StatisticKind::parse("Pearson"), Some(StatisticKind::Pearson));
    assert_eq!(StatisticKind::parse("spearman"), Some(StatisticKind::Spearman));
    assert_eq!(StatisticKind::parse("kendall"), None);
    assert_eq!(StatisticKind::Spearman.to_string(), "spearman");
}

#[test]
fn test_score_outcome_accessors() {
    let ok = ScoreOutcome::Scored(ScoreReport::global(0.5));
    assert_eq!(ok.report().map(|r| r.dockq), Some(0.5));
    assert!(ok.failure().is_none());

    let failed = ScoreOutcome::Failed(ScoreFailure::TimedOut {
        limit: Duration::from_secs(600),
    });
    assert!(failed.report().is_none());
    assert_eq!(
        failed.failure().map(|f| f.to_string()).as_deref(),
        Some("scorer timed out after 600s")
    );

    let killed = ScoreFailure::NonZeroExit {
        code: None,
        stderr: "killed".to_string(),
    };
    assert_eq!(killed.to_string(), "scorer exited with a signal: killed");
}
