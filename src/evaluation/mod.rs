//! Offline evaluation
//!
//! Runs the answer pipeline over a golden dataset, has a judge score every
//! sample on four quality metrics, and condenses the scores into an
//! [`EvaluationReport`].

mod dataset;
mod judge;
mod report;

pub use dataset::{load_dataset, EvaluationCase};
pub use judge::{normalize_scores, Judge, JudgeError, LlmJudge};
pub use report::EvaluationReport;

use crate::config::Config;
use crate::error::{RagError, Result};
use crate::pipeline::AnswerPipeline;
use crate::retrieval::preview;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Answer recorded for a case whose pipeline run failed
pub const ERROR_MARKER: &str = "ERROR";

/// Pass rate (percent) below which a run is flagged failing
pub const DEFAULT_MIN_PASS_RATE: f64 = 75.0;

/// RAG quality metrics scored by the judge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Faithfulness,
    AnswerRelevancy,
    ContextRecall,
    ContextPrecision,
}

/// Default pass threshold per metric
pub const DEFAULT_THRESHOLDS: [(Metric, f64); 4] = [
    (Metric::Faithfulness, 0.80),
    (Metric::AnswerRelevancy, 0.80),
    (Metric::ContextRecall, 0.75),
    (Metric::ContextPrecision, 0.70),
];

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Faithfulness,
        Metric::AnswerRelevancy,
        Metric::ContextRecall,
        Metric::ContextPrecision,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Faithfulness => "faithfulness",
            Metric::AnswerRelevancy => "answer_relevancy",
            Metric::ContextRecall => "context_recall",
            Metric::ContextPrecision => "context_precision",
        }
    }

    pub fn default_threshold(self) -> f64 {
        DEFAULT_THRESHOLDS
            .iter()
            .find(|(m, _)| *m == self)
            .map(|(_, t)| *t)
            .unwrap_or(0.75)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    /// Accepts canonical names plus the aliases judges commonly emit
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "faithfulness" | "faithful" => Ok(Metric::Faithfulness),
            "answer_relevancy" | "answer_relevance" | "relevancy" | "relevance" => {
                Ok(Metric::AnswerRelevancy)
            }
            "context_recall" | "recall" => Ok(Metric::ContextRecall),
            "context_precision" | "precision" => Ok(Metric::ContextPrecision),
            _ => Err(format!("unknown metric '{s}'")),
        }
    }
}

/// Per-metric scores for one sample or one run
pub type MetricScores = BTreeMap<Metric, f64>;

/// One pipeline output prepared for judging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSample {
    pub question: String,
    pub answer: String,
    pub contexts: Vec<String>,
    pub ground_truth: String,

    /// Set when the pipeline failed for this case
    #[serde(default)]
    pub failed: bool,
}

impl EvaluationSample {
    /// Sentinel entry for a case whose pipeline run failed
    pub fn failed(case: &EvaluationCase) -> Self {
        Self {
            question: case.question.clone(),
            answer: ERROR_MARKER.to_string(),
            contexts: Vec::new(),
            ground_truth: case.ground_truth_answer.clone(),
            failed: true,
        }
    }
}

/// Samples and the report from one evaluation run
#[derive(Debug, Clone)]
pub struct EvaluationRun {
    pub report: EvaluationReport,
    pub samples: Vec<EvaluationSample>,
    pub min_pass_rate: f64,
}

impl EvaluationRun {
    /// Whether the pass rate reached the configured minimum
    pub fn passed(&self) -> bool {
        self.report.passed(self.min_pass_rate)
    }

    pub fn failed_cases(&self) -> usize {
        self.samples.iter().filter(|s| s.failed).count()
    }
}

/// Drives the answer pipeline and the judge over a dataset
pub struct Evaluator {
    pipeline: Arc<AnswerPipeline>,
    judge: Arc<dyn Judge>,
    thresholds: BTreeMap<Metric, f64>,
    min_pass_rate: f64,
    max_concurrent: usize,
}

impl Evaluator {
    pub fn new(pipeline: Arc<AnswerPipeline>, judge: Arc<dyn Judge>) -> Self {
        Self {
            pipeline,
            judge,
            thresholds: DEFAULT_THRESHOLDS.into_iter().collect(),
            min_pass_rate: DEFAULT_MIN_PASS_RATE,
            max_concurrent: 1,
        }
    }

    pub fn from_config(config: &Config, pipeline: Arc<AnswerPipeline>, judge: Arc<dyn Judge>) -> Self {
        let thresholds = Metric::ALL
            .iter()
            .map(|m| (*m, config.threshold_for(*m)))
            .collect();

        Self::new(pipeline, judge)
            .with_thresholds(thresholds)
            .with_min_pass_rate(config.evaluation.min_pass_rate)
            .with_max_concurrent(config.evaluation.max_concurrent)
    }

    pub fn with_thresholds(mut self, thresholds: BTreeMap<Metric, f64>) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_min_pass_rate(mut self, min_pass_rate: f64) -> Self {
        self.min_pass_rate = min_pass_rate;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Answer every case, recording a sentinel sample for each failure.
    ///
    /// Up to `max_concurrent` cases are in flight at once; the returned
    /// samples are always in dataset order.
    pub async fn collect_samples(&self, cases: &[EvaluationCase]) -> Vec<EvaluationSample> {
        let total = cases.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(total);

        for (i, case) in cases.iter().cloned().enumerate() {
            let pipeline = self.pipeline.clone();
            let semaphore = semaphore.clone();

            handles.push(tokio::spawn(async move {
                // Closed semaphore only happens on shutdown; run unthrottled then
                let _permit = semaphore.acquire_owned().await.ok();
                info!("{}/{}: {}", i + 1, total, preview(&case.question, 60));

                match pipeline.answer_with_evidence(&case.question).await {
                    Ok(answer) => EvaluationSample {
                        question: case.question,
                        answer: answer.text,
                        contexts: answer.contexts,
                        ground_truth: case.ground_truth_answer,
                        failed: false,
                    },
                    Err(e) => {
                        warn!("Case {} failed: {}", i + 1, e);
                        EvaluationSample::failed(&case)
                    }
                }
            }));
        }

        let mut samples = Vec::with_capacity(total);
        for (handle, case) in handles.into_iter().zip(cases) {
            match handle.await {
                Ok(sample) => samples.push(sample),
                Err(e) => {
                    warn!("Case task aborted: {}", e);
                    samples.push(EvaluationSample::failed(case));
                }
            }
        }
        samples
    }

    /// Evaluate a dataset and build the report.
    ///
    /// Per-case pipeline failures are absorbed; judge failures abort the run.
    pub async fn evaluate(&self, cases: &[EvaluationCase]) -> Result<EvaluationRun> {
        if cases.is_empty() {
            return Err(RagError::InvalidInput(
                "evaluation dataset contains no cases".to_string(),
            ));
        }

        info!("Generating answers for {} questions", cases.len());
        let samples = self.collect_samples(cases).await;

        let scored: Vec<EvaluationSample> =
            samples.iter().filter(|s| !s.failed).cloned().collect();
        info!(
            "Scoring {} samples with judge {} ({} failed cases scored 0)",
            scored.len(),
            self.judge.model_id(),
            samples.len() - scored.len()
        );

        let verdicts = if scored.is_empty() {
            Vec::new()
        } else {
            self.judge
                .score_batch(&scored)
                .await
                .map_err(|source| RagError::Judging {
                    context: format!("judge {} over {} samples", self.judge.model_id(), scored.len()),
                    source,
                })?
        };

        if verdicts.len() != scored.len() {
            return Err(RagError::Judging {
                context: format!("judge {}", self.judge.model_id()),
                source: JudgeError::BatchSizeMismatch {
                    expected: scored.len(),
                    actual: verdicts.len(),
                },
            });
        }

        let failed_scores: MetricScores = Metric::ALL.iter().map(|m| (*m, 0.0)).collect();
        let mut verdicts = verdicts.into_iter();
        let per_sample: Vec<MetricScores> = samples
            .iter()
            .map(|s| {
                if s.failed {
                    failed_scores.clone()
                } else {
                    verdicts.next().unwrap_or_default()
                }
            })
            .collect();

        let scores = aggregate(&per_sample);
        let report = EvaluationReport::new(&scores, &self.thresholds, cases.len(), self.judge.model_id());

        Ok(EvaluationRun {
            report,
            samples,
            min_pass_rate: self.min_pass_rate,
        })
    }

    /// Evaluate and persist the report to `output`
    pub async fn evaluate_to_file(&self, cases: &[EvaluationCase], output: &Path) -> Result<EvaluationRun> {
        let run = self.evaluate(cases).await?;
        run.report.save(output)?;
        info!("Saved evaluation report to {}", output.display());
        Ok(run)
    }
}

/// Arithmetic mean per metric over the samples that produced a value.
/// A metric no sample produced scores 0.0.
pub fn aggregate(per_sample: &[MetricScores]) -> MetricScores {
    Metric::ALL
        .iter()
        .map(|metric| {
            let values: Vec<f64> = per_sample.iter().filter_map(|s| s.get(metric).copied()).collect();
            let mean = if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            };
            (*metric, mean)
        })
        .collect()
}
