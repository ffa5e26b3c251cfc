use std::fs;

use super::*;
use crate::model::ScoreOutcome;
use crate::testing::{BenchFixture, MockComparator};

fn scenario_scores() -> MockComparator {
    MockComparator::from_scores(&[("T1", 1, 0.9), ("T1", 2, 0.7), ("T2", 1, 0.5), ("T2", 2, 0.3)])
}

fn dockq_run(fx: &BenchFixture, jobs: usize) -> DockqRun {
    DockqRun {
        layout: fx.layout(),
        name: "AFMultimer".to_string(),
        jobs,
        debug_table: false,
    }
}

fn leftover_scratch(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .starts_with(".dockq-scratch-")
        })
        .count()
}

#[test]
fn test_scenario_all_pairs_scored() {
    let fx = BenchFixture::scenario_a();
    let out = run_dockq_benchmark(&dockq_run(&fx, 1), &scenario_scores()).unwrap();

    assert_eq!(out.n_pairs, 4);
    assert_eq!(out.n_scored, 4);
    assert_eq!(out.n_failed, 0);
    assert_eq!(out.table_path, fx.output_dir.join("AFMultimer.dockq.csv"));
    assert_eq!(
        fs::read_to_string(&out.table_path).unwrap(),
        "id,rank,chains_model,ptm,plddt,iptm,chains_native,dockq,irmsd,lrmsd,fnat\n\
         T1,1,AB,0.80,85.0,0.75,AB,0.9,,,\n\
         T1,2,AB,0.70,80.0,0.60,AB,0.7,,,\n\
         T2,1,AB,0.60,70.0,0.50,AB,0.5,,,\n\
         T2,2,AB,0.50,65.0,0.40,AB,0.3,,,\n"
    );
    assert_eq!(leftover_scratch(&fx.output_dir), 0);

    let cfg = CorrelationConfig {
        methods: vec!["all".to_string()],
        ..CorrelationConfig::default()
    };
    let corr = run_correlation(&out.table_path, &fx.output_dir, "AFMultimer", &cfg).unwrap();
    assert_eq!(corr.n_rows, 6);
    assert_eq!(corr.report_path, fx.output_dir.join("AFMultimer.correlation.csv"));

    let report = read_table(&corr.report_path).unwrap();
    assert_eq!(report.columns, stage4_correlate::REPORT_COLUMNS.to_vec());
    let combos = report
        .rows
        .iter()
        .map(|r| (r[1].as_str(), r[2].as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        combos,
        vec![
            ("iptm", "pearson"),
            ("iptm", "spearman"),
            ("plddt", "pearson"),
            ("plddt", "spearman"),
            ("ptm", "pearson"),
            ("ptm", "spearman"),
        ]
    );
    assert!(report.rows.iter().all(|r| r[0] == "all"));
}

#[test]
fn test_scenario_missing_native_fails_before_scoring() {
    let fx = BenchFixture::scenario_a();
    fx.write_natives("id,chains\nT1,AB\n");
    let cmp = scenario_scores();
    let err = run_dockq_benchmark(&dockq_run(&fx, 1), &cmp).unwrap_err();

    match &err {
        PipelineError::Resolve(ResolveError::MissingNative { ids }) => assert_eq!(ids, &["T2"]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("T2"));
    assert!(cmp.calls().is_empty());
    assert!(!dockq_table_path(&fx.output_dir, "AFMultimer").exists());
    assert_eq!(leftover_scratch(&fx.output_dir), 0);
}

#[test]
fn test_scenario_one_failure_keeps_the_row() {
    let fx = BenchFixture::scenario_a();
    let cmp = MockComparator::from_scores(&[("T1", 1, 0.9), ("T1", 2, 0.7), ("T2", 2, 0.3)]);
    let out = run_dockq_benchmark(&dockq_run(&fx, 2), &cmp).unwrap();

    assert_eq!(out.n_pairs, 4);
    assert_eq!(out.n_scored, 3);
    assert_eq!(out.n_failed, 1);

    let table = read_table(&out.table_path).unwrap();
    let dockq = table.column_index("dockq").unwrap();
    let values = (0..table.n_rows())
        .map(|r| table.value(r, dockq))
        .collect::<Vec<_>>();
    assert_eq!(values, vec!["0.9", "0.7", "", "0.3"]);

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out.summary_path).unwrap()).unwrap();
    assert_eq!(summary["n_failed"], 1);
    assert_eq!(summary["comparator"], "mock");
    assert_eq!(summary["model_format"], "pdb");
    assert_eq!(summary["failures"][0]["id"], "T2");
    assert_eq!(summary["failures"][0]["rank"], 1);
    assert_eq!(summary["dockq_mean"], 0.633);

    let cfg = CorrelationConfig {
        methods: vec!["all".to_string()],
        features: vec!["ptm".to_string()],
        ..CorrelationConfig::default()
    };
    let rows = stage4_correlate::correlate(&table, &cfg).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.r == Some(1.0)));
}

#[test]
fn test_fatal_comparator_error_writes_nothing() {
    let fx = BenchFixture::scenario_a();
    let cmp = MockComparator::new(|_| {
        Err(crate::comparator::ComparatorError::ProgramUnavailable {
            program: "DockQ".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    });
    let mut run = dockq_run(&fx, 1);
    run.debug_table = true;
    let err = run_dockq_benchmark(&run, &cmp).unwrap_err();

    assert!(matches!(err, PipelineError::Aggregate(AggregateError::Comparator(_))));
    assert_eq!(cmp.calls().len(), 1);
    assert!(!dockq_table_path(&fx.output_dir, "AFMultimer").exists());
    assert!(!summary_path(&fx.output_dir, "AFMultimer").exists());
    assert!(!debug_table_path(&fx.output_dir, "AFMultimer").exists());
    assert_eq!(leftover_scratch(&fx.output_dir), 0);
}

#[test]
fn test_failed_summary_write_removes_earlier_outputs() {
    let fx = BenchFixture::scenario_a();
    // a directory in place of the summary file makes its rename fail
    fs::create_dir_all(summary_path(&fx.output_dir, "AFMultimer").join("blocker")).unwrap();
    let mut run = dockq_run(&fx, 1);
    run.debug_table = true;
    let err = run_dockq_benchmark(&run, &scenario_scores()).unwrap_err();

    assert!(matches!(err, PipelineError::Report(_)));
    assert!(!dockq_table_path(&fx.output_dir, "AFMultimer").exists());
    assert!(!debug_table_path(&fx.output_dir, "AFMultimer").exists());
    assert_eq!(leftover_scratch(&fx.output_dir), 0);
}

#[test]
fn test_rerun_is_byte_identical() {
    let fx = BenchFixture::scenario_a();
    let first = run_dockq_benchmark(&dockq_run(&fx, 1), &scenario_scores()).unwrap();
    let bytes = fs::read(&first.table_path).unwrap();
    let second = run_dockq_benchmark(&dockq_run(&fx, 3), &scenario_scores()).unwrap();
    assert_eq!(bytes, fs::read(&second.table_path).unwrap());
}

#[test]
fn test_debug_table_is_written_on_request() {
    let fx = BenchFixture::scenario_a();
    let mut run = dockq_run(&fx, 1);
    run.debug_table = true;
    run_dockq_benchmark(&run, &scenario_scores()).unwrap();

    let debug = read_table(&debug_table_path(&fx.output_dir, "AFMultimer")).unwrap();
    assert_eq!(debug.n_rows(), 4);
    assert!(debug.has_column("json_path"));
}

#[test]
fn test_scorer_sees_unique_report_paths_in_scratch() {
    let fx = BenchFixture::scenario_a();
    let output_dir = fx.output_dir.clone();
    let cmp = MockComparator::new(move |t| {
        let scratch = t.report_path.parent().unwrap();
        assert!(scratch.starts_with(&output_dir));
        assert!(scratch.is_dir());
        Ok(ScoreOutcome::Scored(crate::model::ScoreReport::global(0.5)))
    });
    run_dockq_benchmark(&dockq_run(&fx, 4), &cmp).unwrap();
    let mut reports = cmp.calls().iter().map(|k| k.file_stem()).collect::<Vec<_>>();
    reports.sort();
    reports.dedup();
    assert_eq!(reports.len(), 4);
}

#[test]
fn test_correlation_missing_input() {
    let fx = BenchFixture::new();
    let err = run_correlation(
        &fx.output_dir.join("absent.dockq.csv"),
        &fx.output_dir,
        "AFMultimer",
        &CorrelationConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::Input(InputError::MissingInput(_))));
}
