//! Quality gate over report files on disk
use ragops::evaluation::{EvaluationReport, Metric};
use ragops::gate::{compare_report_files, ComparisonStatus, DEFAULT_DEGRADATION_THRESHOLD};
use ragops::RagError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, json: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, json).unwrap();
    path
}

fn metrics() -> Vec<String> {
    Metric::ALL.iter().map(|m| m.as_str().to_string()).collect()
}

#[test]
fn test_each_status_from_files() {
    let temp = TempDir::new().unwrap();
    let baseline = write(
        temp.path(),
        "baseline.json",
        r#"{
            "scores": {"faithfulness": 0.80, "answer_relevancy": 0.80, "context_recall": 0.80, "context_precision": 0.80},
            "pass_rate": 100.0,
            "num_test_cases": 20,
            "judge_model": "gpt-4-turbo",
            "thresholds": {"faithfulness": 0.80, "answer_relevancy": 0.80, "context_recall": 0.75, "context_precision": 0.70}
        }"#,
    );
    let current = write(
        temp.path(),
        "current.json",
        r#"{
            "scores": {"faithfulness": 0.70, "answer_relevancy": 0.78, "context_recall": 0.85, "context_precision": 0.80},
            "pass_rate": 50.0,
            "num_test_cases": 20,
            "judge_model": "gpt-4-turbo",
            "thresholds": {}
        }"#,
    );

    let gate = compare_report_files(&baseline, &current, DEFAULT_DEGRADATION_THRESHOLD, &metrics()).unwrap();
    let statuses: Vec<ComparisonStatus> = gate.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            ComparisonStatus::Regression,
            ComparisonStatus::Degraded,
            ComparisonStatus::Improved,
            ComparisonStatus::Maintained,
        ]
    );
    assert!(gate.regressed);
    assert_eq!(gate.passes(), 3);
    assert_eq!(gate.exit_code(), 1);

    let printed = gate.to_string();
    assert!(printed.contains("REGRESSION  faithfulness"));
    assert!(printed.contains("Summary: 3/4 metrics passed"));
}

#[test]
fn test_older_report_without_precision() {
    let temp = TempDir::new().unwrap();
    let baseline = write(
        temp.path(),
        "baseline.json",
        r#"{"scores": {"faithfulness": 0.9, "answer_relevancy": 0.9, "context_recall": 0.9}}"#,
    );
    let current = write(
        temp.path(),
        "current.json",
        r#"{"scores": {"faithfulness": 0.9, "answer_relevancy": 0.9, "context_recall": 0.9, "context_precision": 0.72}}"#,
    );

    let gate = compare_report_files(&baseline, &current, 0.05, &metrics()).unwrap();
    assert!(!gate.regressed);
    let precision = &gate.results[3];
    assert_eq!(precision.metric, "context_precision");
    assert_eq!(precision.baseline, 0.0);
    assert_eq!(precision.status, ComparisonStatus::Improved);
}

#[test]
fn test_pass_rate_shortfall_is_not_a_regression() {
    // Both runs fail their own 75% bar, yet nothing regressed between them
    let temp = TempDir::new().unwrap();
    let json = r#"{"scores": {"faithfulness": 0.81, "answer_relevancy": 0.79, "context_recall": 0.76, "context_precision": 0.69}, "pass_rate": 50.0}"#;
    let baseline = write(temp.path(), "baseline.json", json);
    let current = write(temp.path(), "current.json", json);

    let report = EvaluationReport::load(&current).unwrap();
    assert_eq!(report.passes(), 2);
    assert!(!report.passed(75.0));

    let gate = compare_report_files(&baseline, &current, 0.05, &metrics()).unwrap();
    assert!(!gate.regressed);
}

#[test]
fn test_malformed_report_is_an_error() {
    let temp = TempDir::new().unwrap();
    let good = write(temp.path(), "good.json", r#"{"scores": {}}"#);
    let bad = write(temp.path(), "bad.json", "{ scores: ");

    assert!(matches!(
        compare_report_files(&good, &bad, 0.05, &metrics()),
        Err(RagError::Json { .. })
    ));
    assert!(matches!(
        compare_report_files(&good, &temp.path().join("missing.json"), 0.05, &metrics()),
        Err(RagError::ReportNotFound { .. })
    ));
}
