//! Deterministic stand-ins for the embedding, generation and judging services
#![allow(dead_code)]

use async_trait::async_trait;
use ragops::embedding::{EmbeddingError, EmbeddingProvider};
use ragops::evaluation::{EvaluationSample, Judge, JudgeError, Metric, MetricScores};
use ragops::generation::{GenerationError, Generator};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const HASH_MODEL: &str = "hash-embedder";
const HASH_DIM: usize = 64;

/// Bag-of-words embedder: each lowercase word hashes into one of 64 buckets
pub struct HashEmbedder;

fn bucket(word: &str) -> usize {
    // FNV-1a
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in word.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash % HASH_DIM as u64) as usize
}

impl EmbeddingProvider for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0.0f32; HASH_DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[bucket(&word.to_lowercase())] += 1.0;
        }
        Ok(vector)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize {
        HASH_DIM
    }

    fn model_name(&self) -> &str {
        HASH_MODEL
    }
}

/// Records every prompt and replies with the first context line it was given
#[derive(Default)]
pub struct RecordingGenerator {
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl Generator for RecordingGenerator {
    fn model_name(&self) -> &str {
        "recording-generator"
    }

    async fn generate(&self, prompt: &str, _temperature: f32) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let answer = prompt
            .split("Context:\n")
            .nth(1)
            .and_then(|rest| rest.lines().next())
            .unwrap_or("I don't have enough information to answer this question.");
        Ok(answer.to_string())
    }
}

/// Judge that rewards answers sharing words with the ground truth
pub struct OverlapJudge;

#[async_trait]
impl Judge for OverlapJudge {
    fn model_id(&self) -> &str {
        "overlap-judge"
    }

    async fn score(&self, sample: &EvaluationSample) -> Result<MetricScores, JudgeError> {
        let truth: Vec<String> = sample
            .ground_truth
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();
        let answer = sample.answer.to_lowercase();
        let hits = truth.iter().filter(|w| answer.contains(w.as_str())).count();
        let score = if truth.is_empty() {
            0.0
        } else {
            hits as f64 / truth.len() as f64
        };
        Ok(Metric::ALL.into_iter().map(|m| (m, score)).collect())
    }
}

/// Write a form-feed paginated document with `pages` pages of distinct prose
pub fn write_paged_document(dir: &Path, pages: usize) -> PathBuf {
    let topics = [
        "glaciers", "volcanoes", "orchards", "lighthouses", "railways",
        "beekeeping", "telescopes", "tidepools", "bridges", "windmills",
    ];

    let text = (0..pages)
        .map(|i| {
            let topic = topics[i % topics.len()];
            let mut page = format!("Chapter {} is about {topic}.\n\n", i + 1);
            for p in 0..6 {
                page.push_str(&format!(
                    "Paragraph {p} explains how {topic} shaped the region in detail. \
                     Observers recorded the {topic} carefully across many seasons and years. \
                     The archive keeps notes on {topic} from every decade of the survey.\n\n"
                ));
            }
            page
        })
        .collect::<Vec<_>>()
        .join("\x0c");

    let path = dir.join("source_document.txt");
    std::fs::write(&path, text).unwrap();
    path
}
