use super::{Metric, MetricScores};
use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Result of one evaluation run, and the file format compared by the
/// quality gate.
///
/// Every field defaults when absent so older or partial reports still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,

    /// Percentage of metrics meeting their threshold
    #[serde(default)]
    pub pass_rate: f64,

    #[serde(default)]
    pub num_test_cases: usize,

    #[serde(default)]
    pub judge_model: String,

    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,
}

impl EvaluationReport {
    pub fn new(
        scores: &MetricScores,
        thresholds: &BTreeMap<Metric, f64>,
        num_test_cases: usize,
        judge_model: &str,
    ) -> Self {
        let mut report = Self {
            scores: scores.iter().map(|(m, s)| (m.as_str().to_string(), *s)).collect(),
            pass_rate: 0.0,
            num_test_cases,
            judge_model: judge_model.to_string(),
            thresholds: thresholds
                .iter()
                .map(|(m, t)| (m.as_str().to_string(), *t))
                .collect(),
        };
        report.pass_rate = report.compute_pass_rate();
        report
    }

    /// Score for a metric, 0.0 when the report lacks it
    pub fn score(&self, metric: &str) -> f64 {
        self.scores.get(metric).copied().unwrap_or(0.0)
    }

    /// Threshold for a metric, the built-in default when the report lacks it
    pub fn threshold(&self, metric: &str) -> f64 {
        self.thresholds.get(metric).copied().unwrap_or_else(|| {
            metric
                .parse::<Metric>()
                .map(Metric::default_threshold)
                .unwrap_or(0.75)
        })
    }

    /// Per-metric `(name, score, threshold, passed)` rows in canonical order
    pub fn metric_results(&self) -> Vec<(&'static str, f64, f64, bool)> {
        Metric::ALL
            .iter()
            .map(|m| {
                let name = m.as_str();
                let score = self.score(name);
                let threshold = self.threshold(name);
                (name, score, threshold, score >= threshold)
            })
            .collect()
    }

    /// Number of metrics meeting their threshold
    pub fn passes(&self) -> usize {
        self.metric_results().iter().filter(|r| r.3).count()
    }

    fn compute_pass_rate(&self) -> f64 {
        let total = Metric::ALL.len();
        self.passes() as f64 / total as f64 * 100.0
    }

    /// Whether the run meets `min_pass_rate` (percent)
    pub fn passed(&self, min_pass_rate: f64) -> bool {
        self.pass_rate >= min_pass_rate
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| RagError::Io {
                source: e,
                context: format!("Failed to create report directory: {}", parent.display()),
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| RagError::Json {
            source: e,
            context: "Failed to serialize evaluation report".to_string(),
        })?;

        std::fs::write(path, json).map_err(|e| RagError::Io {
            source: e,
            context: format!("Failed to write report: {}", path.display()),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RagError::ReportNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| RagError::Io {
            source: e,
            context: format!("Failed to read report: {}", path.display()),
        })?;

        serde_json::from_str(&content).map_err(|e| RagError::Json {
            source: e,
            context: format!("Malformed evaluation report: {}", path.display()),
        })
    }
}
