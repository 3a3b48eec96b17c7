//! Judging service boundary and the LLM-as-judge adapter

use super::{EvaluationSample, Metric, MetricScores};
use crate::generation::{GenerationError, Generator};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("Judge service request failed: {0}")]
    Service(#[from] GenerationError),

    #[error("Judge returned {actual} verdicts for {expected} samples")]
    BatchSizeMismatch { expected: usize, actual: usize },
}

/// Scores pipeline samples against ground truth.
///
/// Implementations return a fixed metric→score map with values in [0, 1];
/// a metric the judge could not score is simply absent.
#[async_trait]
pub trait Judge: Send + Sync {
    fn model_id(&self) -> &str;

    async fn score(&self, sample: &EvaluationSample) -> Result<MetricScores, JudgeError>;

    /// Score a batch, one verdict per sample in order
    async fn score_batch(&self, samples: &[EvaluationSample]) -> Result<Vec<MetricScores>, JudgeError> {
        let mut verdicts = Vec::with_capacity(samples.len());
        for sample in samples {
            verdicts.push(self.score(sample).await?);
        }
        Ok(verdicts)
    }
}

/// Judge that asks a chat model for a JSON verdict
pub struct LlmJudge {
    generator: Arc<dyn Generator>,
}

impl LlmJudge {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    fn prompt(sample: &EvaluationSample) -> String {
        let contexts = sample
            .contexts
            .iter()
            .enumerate()
            .map(|(i, c)| format!("[{}] {}", i + 1, c))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are grading the output of a retrieval-augmented question answering system.

Question:
{question}

Retrieved context:
{contexts}

Generated answer:
{answer}

Reference answer:
{ground_truth}

Score each metric from 0.0 to 1.0:
- faithfulness: every claim in the generated answer is supported by the retrieved context
- answer_relevancy: the generated answer addresses the question directly
- context_recall: the retrieved context contains the information in the reference answer
- context_precision: the retrieved context is relevant to the question, most relevant first

Reply with a single JSON object and nothing else, for example:
{{\"faithfulness\": 0.9, \"answer_relevancy\": 0.8, \"context_recall\": 0.7, \"context_precision\": 0.6}}",
            question = sample.question,
            answer = sample.answer,
            ground_truth = sample.ground_truth,
        )
    }
}

#[async_trait]
impl Judge for LlmJudge {
    fn model_id(&self) -> &str {
        self.generator.model_name()
    }

    async fn score(&self, sample: &EvaluationSample) -> Result<MetricScores, JudgeError> {
        let reply = self.generator.generate(&Self::prompt(sample), 0.0).await?;
        debug!("Judge reply: {}", reply);

        let Some(verdict) = extract_json(&reply) else {
            warn!("Judge reply contained no JSON object; case left unscored");
            return Ok(MetricScores::new());
        };

        let scores = normalize_scores(&verdict);
        if scores.len() < Metric::ALL.len() {
            warn!(
                "Judge scored {}/{} metrics for '{}'",
                scores.len(),
                Metric::ALL.len(),
                sample.question
            );
        }
        Ok(scores)
    }
}

/// First JSON object embedded in a model reply (code fences and prose allowed)
fn extract_json(reply: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(reply.trim()) {
        return Some(value);
    }

    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&reply[start..=end]).ok()
}

/// Normalise whatever shape a judge returns into a metric→score map.
///
/// Accepts numbers, numeric strings, lists (averaged), `{"score": x}`
/// objects and a nested `scores` object; keys may use any known metric
/// alias. Values are clamped to [0, 1]; unusable values are dropped.
pub fn normalize_scores(verdict: &Value) -> MetricScores {
    let mut scores = MetricScores::new();

    let Value::Object(map) = verdict else {
        return scores;
    };

    for (key, value) in map {
        if key == "scores" || key == "metrics" {
            scores.extend(normalize_scores(value));
            continue;
        }
        let Ok(metric) = key.parse::<Metric>() else {
            continue;
        };
        if let Some(score) = numeric_value(value) {
            scores.insert(metric, score.clamp(0.0, 1.0));
        }
    }

    scores
}

fn numeric_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Array(items) => {
            let values: Vec<f64> = items.iter().filter_map(numeric_value).collect();
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        Value::Object(map) => map
            .get("score")
            .or_else(|| map.get("value"))
            .and_then(numeric_value),
        _ => None,
    }?;

    number.is_finite().then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct CannedGenerator {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Generator for CannedGenerator {
        fn model_name(&self) -> &str {
            "canned-judge"
        }

        async fn generate(&self, prompt: &str, _temperature: f32) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    fn sample() -> EvaluationSample {
        EvaluationSample {
            question: "What is the capital?".to_string(),
            answer: "Paris".to_string(),
            contexts: vec!["Paris is the capital.".to_string()],
            ground_truth: "Paris".to_string(),
            failed: false,
        }
    }

    #[test]
    fn test_normalize_plain_numbers() {
        let scores = normalize_scores(&json!({
            "faithfulness": 0.9,
            "answer_relevancy": "0.8",
            "context_recall": [1.0, 0.5],
            "context_precision": {"score": 0.6}
        }));
        assert_eq!(scores[&Metric::Faithfulness], 0.9);
        assert_eq!(scores[&Metric::AnswerRelevancy], 0.8);
        assert_eq!(scores[&Metric::ContextRecall], 0.75);
        assert_eq!(scores[&Metric::ContextPrecision], 0.6);
    }

    #[test]
    fn test_normalize_nested_aliases_and_clamping() {
        let scores = normalize_scores(&json!({
            "scores": {"Answer Relevance": 1.4, "recall": -0.2},
            "precision": "n/a",
            "bleu": 0.3
        }));
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[&Metric::AnswerRelevancy], 1.0);
        assert_eq!(scores[&Metric::ContextRecall], 0.0);
    }

    #[test]
    fn test_normalize_non_object() {
        assert!(normalize_scores(&json!([0.5, 0.5])).is_empty());
        assert!(normalize_scores(&json!({"faithfulness": []})).is_empty());
    }

    #[test]
    fn test_extract_json_from_prose() {
        let reply = "Here you go:\n```json\n{\"faithfulness\": 1}\n```";
        assert_eq!(extract_json(reply).unwrap(), json!({"faithfulness": 1}));
        assert!(extract_json("no verdict").is_none());
    }

    #[tokio::test]
    async fn test_llm_judge_scores_sample() {
        let generator = Arc::new(CannedGenerator {
            reply: r#"{"faithfulness": 1.0, "answer_relevancy": 0.5}"#.to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let judge = LlmJudge::new(generator.clone());
        let scores = judge.score(&sample()).await.unwrap();

        assert_eq!(judge.model_id(), "canned-judge");
        assert_eq!(scores.len(), 2);
        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("[1] Paris is the capital."));
        assert!(prompts[0].contains("What is the capital?"));
    }

    #[tokio::test]
    async fn test_unparseable_reply_leaves_case_unscored() {
        let judge = LlmJudge::new(Arc::new(CannedGenerator {
            reply: "I cannot grade this.".to_string(),
            prompts: Mutex::new(Vec::new()),
        }));
        let verdicts = judge.score_batch(&[sample(), sample()]).await.unwrap();
        assert_eq!(verdicts.len(), 2);
        assert!(verdicts.iter().all(|v| v.is_empty()));
    }
}
