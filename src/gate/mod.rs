//! Quality gate
//!
//! Compares a current evaluation report against a baseline and flags any
//! metric that dropped by more than the allowed degradation.

use crate::error::Result;
use crate::evaluation::EvaluationReport;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default maximum allowed drop per metric (five percentage points)
pub const DEFAULT_DEGRADATION_THRESHOLD: f64 = 0.05;

/// Outcome for one metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonStatus {
    /// Dropped by more than the threshold; fails the gate
    Regression,
    /// Dropped, but within the threshold
    Degraded,
    Improved,
    Maintained,
}

impl ComparisonStatus {
    pub fn classify(baseline: f64, current: f64, threshold: f64) -> Self {
        let degradation = baseline - current;
        if degradation > threshold {
            ComparisonStatus::Regression
        } else if current < baseline {
            ComparisonStatus::Degraded
        } else if current > baseline {
            ComparisonStatus::Improved
        } else {
            ComparisonStatus::Maintained
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonStatus::Regression => "REGRESSION",
            ComparisonStatus::Degraded => "DEGRADED",
            ComparisonStatus::Improved => "IMPROVED",
            ComparisonStatus::Maintained => "MAINTAINED",
        }
    }
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub metric: String,
    pub baseline: f64,
    pub current: f64,
    /// `current - baseline`
    pub diff: f64,
    pub status: ComparisonStatus,
    pub passed: bool,
}

/// Per-metric comparisons plus the overall verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateReport {
    pub results: Vec<MetricComparison>,
    pub regressed: bool,
    pub threshold: f64,
}

impl GateReport {
    pub fn passes(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Exit status for automation: 0 on pass, 1 on regression
    pub fn exit_code(&self) -> u8 {
        u8::from(self.regressed)
    }
}

impl fmt::Display for GateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Metric comparison (threshold: {:.0}% degradation)",
            self.threshold * 100.0
        )?;
        writeln!(f, "{}", "-".repeat(60))?;
        for r in &self.results {
            writeln!(
                f,
                "{:<11} {:<20}: {:.3} (was {:.3}, Δ {:+.3})",
                r.status.as_str(),
                r.metric,
                r.current,
                r.baseline,
                r.diff
            )?;
        }
        writeln!(f, "{}", "-".repeat(60))?;
        write!(f, "Summary: {}/{} metrics passed", self.passes(), self.total())
    }
}

/// Compare `current` against `baseline` for each metric in `metrics`.
///
/// A metric absent from either report counts as 0.0.
pub fn compare_reports(
    baseline: &EvaluationReport,
    current: &EvaluationReport,
    threshold: f64,
    metrics: &[String],
) -> GateReport {
    let results: Vec<MetricComparison> = metrics
        .iter()
        .map(|metric| {
            let baseline_score = baseline.score(metric);
            let current_score = current.score(metric);
            let status = ComparisonStatus::classify(baseline_score, current_score, threshold);

            MetricComparison {
                metric: metric.clone(),
                baseline: baseline_score,
                current: current_score,
                diff: current_score - baseline_score,
                status,
                passed: status != ComparisonStatus::Regression,
            }
        })
        .collect();

    let regressed = results.iter().any(|r| !r.passed);
    if regressed {
        tracing::warn!(
            "Quality gate failed: {} metric(s) regressed beyond {:.3}",
            results.iter().filter(|r| !r.passed).count(),
            threshold
        );
    }

    GateReport {
        results,
        regressed,
        threshold,
    }
}

/// Load two report files and compare them
pub fn compare_report_files(
    baseline_path: &Path,
    current_path: &Path,
    threshold: f64,
    metrics: &[String],
) -> Result<GateReport> {
    tracing::info!("Loading baseline from {}", baseline_path.display());
    let baseline = EvaluationReport::load(baseline_path)?;
    tracing::info!("Loading current from {}", current_path.display());
    let current = EvaluationReport::load(current_path)?;

    Ok(compare_reports(&baseline, &current, threshold, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::Metric;

    fn report(scores: &[(&str, f64)]) -> EvaluationReport {
        EvaluationReport {
            scores: scores.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            ..Default::default()
        }
    }

    fn all_metrics() -> Vec<String> {
        Metric::ALL.iter().map(|m| m.as_str().to_string()).collect()
    }

    #[test]
    fn test_classification() {
        let t = DEFAULT_DEGRADATION_THRESHOLD;
        assert_eq!(ComparisonStatus::classify(0.80, 0.70, t), ComparisonStatus::Regression);
        assert_eq!(ComparisonStatus::classify(0.80, 0.78, t), ComparisonStatus::Degraded);
        assert_eq!(ComparisonStatus::classify(0.80, 0.85, t), ComparisonStatus::Improved);
        assert_eq!(ComparisonStatus::classify(0.80, 0.80, t), ComparisonStatus::Maintained);
    }

    #[test]
    fn test_regression_fails_gate() {
        let baseline = report(&[("faithfulness", 0.80), ("answer_relevancy", 0.80)]);
        let current = report(&[("faithfulness", 0.70), ("answer_relevancy", 0.78)]);
        let metrics = vec!["faithfulness".to_string(), "answer_relevancy".to_string()];

        let gate = compare_reports(&baseline, &current, 0.05, &metrics);
        assert!(gate.regressed);
        assert_eq!(gate.exit_code(), 1);
        assert_eq!(gate.passes(), 1);
        assert_eq!(gate.results[0].status, ComparisonStatus::Regression);
        assert!(!gate.results[0].passed);
        assert_eq!(gate.results[1].status, ComparisonStatus::Degraded);
        assert!(gate.results[1].passed);
    }

    #[test]
    fn test_degraded_within_threshold_passes() {
        let baseline = report(&[("faithfulness", 0.80)]);
        let current = report(&[("faithfulness", 0.78)]);
        let gate = compare_reports(&baseline, &current, 0.05, &["faithfulness".to_string()]);
        assert!(!gate.regressed);
        assert_eq!(gate.exit_code(), 0);
    }

    #[test]
    fn test_missing_metric_defaults_to_zero() {
        let full = [
            ("faithfulness", 0.9),
            ("answer_relevancy", 0.9),
            ("context_recall", 0.9),
        ];
        let baseline = report(&full);
        let current = report(&full);

        let gate = compare_reports(&baseline, &current, 0.05, &all_metrics());
        let precision = gate
            .results
            .iter()
            .find(|r| r.metric == "context_precision")
            .unwrap();
        assert_eq!(precision.baseline, 0.0);
        assert_eq!(precision.current, 0.0);
        assert_eq!(precision.status, ComparisonStatus::Maintained);
        assert!(!gate.regressed);

        // Metric present in the baseline but dropped from the current report
        let mut with_precision = full.to_vec();
        with_precision.push(("context_precision", 0.8));
        let gate = compare_reports(&report(&with_precision), &current, 0.05, &all_metrics());
        assert!(gate.regressed);
    }

    #[test]
    fn test_display_summary() {
        let baseline = report(&[("faithfulness", 0.80)]);
        let current = report(&[("faithfulness", 0.85)]);
        let gate = compare_reports(&baseline, &current, 0.05, &["faithfulness".to_string()]);
        let text = gate.to_string();
        assert!(text.contains("IMPROVED"));
        assert!(text.contains("Δ +0.050"));
        assert!(text.contains("Summary: 1/1 metrics passed"));
    }

    #[test]
    fn test_compare_report_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let baseline_path = dir.path().join("baseline.json");
        let current_path = dir.path().join("current.json");
        report(&[("faithfulness", 0.9)]).save(&baseline_path).unwrap();
        report(&[("faithfulness", 0.9)]).save(&current_path).unwrap();

        let gate = compare_report_files(&baseline_path, &current_path, 0.05, &all_metrics()).unwrap();
        assert!(!gate.regressed);
        assert_eq!(gate.total(), 4);

        let missing = compare_report_files(&dir.path().join("nope.json"), &current_path, 0.05, &all_metrics());
        assert!(matches!(missing, Err(crate::error::RagError::ReportNotFound { .. })));
    }
}
