//! Configuration management for ragops
//!
//! One TOML file drives ingestion, retrieval, generation, evaluation and the
//! quality gate. Values can be overridden per profile and through
//! `RAGOPS_SECTION__KEY` environment variables.

use crate::embedding::SimilarityMetric;
use crate::error::{RagError, Result};
use crate::evaluation::{Metric, DEFAULT_THRESHOLDS};
use crate::ingest::DEFAULT_BOUNDARIES;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// File name looked up in the working directory before the user config dir
pub const LOCAL_CONFIG_FILE: &str = "ragops.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub ingestion: IngestionConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
    pub evaluation: EvaluationConfig,
    pub gate: GateConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Document ingestion and chunking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    pub source_path: PathBuf,
    pub index_path: PathBuf,
    /// Chunk size in characters
    pub chunk_size: usize,
    /// Characters shared by adjacent chunks, must be below chunk_size
    pub chunk_overlap: usize,
    /// Boundary regexes, most preferred first
    #[serde(default = "default_boundaries")]
    pub boundaries: Vec<String>,
}

fn default_boundaries() -> Vec<String> {
    DEFAULT_BOUNDARIES.iter().map(|s| s.to_string()).collect()
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub batch_size: usize,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the generator
    pub top_k: usize,
    /// Must match the metric the index was built with
    pub metric: SimilarityMetric,
}

/// Generation service configuration (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    /// 0.0 keeps answers reproducible for evaluation
    pub temperature: f32,
    pub timeout_secs: u64,
}

/// Evaluation run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub dataset_path: PathBuf,
    pub report_path: PathBuf,
    pub judge_model: String,
    /// Percentage of metrics that must pass for the run to pass
    pub min_pass_rate: f64,
    /// Cases answered concurrently (1 = sequential)
    pub max_concurrent: usize,
    /// Per-metric pass thresholds in [0, 1]
    pub thresholds: BTreeMap<String, f64>,
}

/// Quality gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Largest allowed drop per metric (0.05 = 5 points)
    pub degradation_threshold: f64,
    pub metrics: Vec<String>,
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judge_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RagError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| RagError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| RagError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| RagError::Config(format!("Unknown profile: {profile}")))?;

        if let Some(model) = overrides.generation_model {
            self.generation.model = model;
        }
        if let Some(model) = overrides.judge_model {
            self.evaluation.judge_model = model;
        }
        if let Some(model) = overrides.embedding_model {
            self.embedding.model = model;
        }
        if let Some(top_k) = overrides.top_k {
            self.retrieval.top_k = top_k;
        }
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: RAGOPS_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("RAGOPS_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "INGESTION__SOURCE_PATH" => self.ingestion.source_path = PathBuf::from(value),
            "INGESTION__INDEX_PATH" => self.ingestion.index_path = PathBuf::from(value),
            "INGESTION__CHUNK_SIZE" => self.ingestion.chunk_size = parse_env(path, value)?,
            "INGESTION__CHUNK_OVERLAP" => self.ingestion.chunk_overlap = parse_env(path, value)?,
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "RETRIEVAL__TOP_K" => self.retrieval.top_k = parse_env(path, value)?,
            "RETRIEVAL__METRIC" => {
                self.retrieval.metric =
                    value.parse().map_err(|message| RagError::InvalidConfigValue {
                        path: path.to_string(),
                        message,
                    })?;
            }
            "GENERATION__BASE_URL" => self.generation.base_url = value.to_string(),
            "GENERATION__MODEL" => self.generation.model = value.to_string(),
            "GENERATION__TEMPERATURE" => self.generation.temperature = parse_env(path, value)?,
            "EVALUATION__JUDGE_MODEL" => self.evaluation.judge_model = value.to_string(),
            "EVALUATION__MAX_CONCURRENT" => {
                self.evaluation.max_concurrent = parse_env(path, value)?;
            }
            "GATE__DEGRADATION_THRESHOLD" => {
                self.gate.degradation_threshold = parse_env(path, value)?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Resolve the configuration file to use: `./ragops.toml` if present,
    /// otherwise the per-user location
    pub fn default_path() -> Result<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Ok(local);
        }
        Self::user_config_path()
    }

    /// Per-user configuration file location
    pub fn user_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| RagError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("ragops").join("config.toml"))
    }

    /// Threshold for one metric, falling back to its built-in default.
    ///
    /// Keys may be any metric alias; the canonical name wins if both are set.
    pub fn threshold_for(&self, metric: Metric) -> f64 {
        let thresholds = &self.evaluation.thresholds;
        thresholds
            .get(metric.as_str())
            .or_else(|| {
                thresholds
                    .iter()
                    .find(|(name, _)| name.parse::<Metric>() == Ok(metric))
                    .map(|(_, value)| value)
            })
            .copied()
            .unwrap_or_else(|| metric.default_threshold())
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| RagError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            ingestion: IngestionConfig {
                source_path: PathBuf::from("data/source_document.txt"),
                index_path: PathBuf::from("vector_index/index.json.zst"),
                chunk_size: 1000,
                chunk_overlap: 200,
                boundaries: default_boundaries(),
            },
            embedding: EmbeddingConfig {
                model: "all-MiniLM-L6-v2".to_string(),
                batch_size: 32,
            },
            retrieval: RetrievalConfig {
                top_k: 4,
                metric: SimilarityMetric::Cosine,
            },
            generation: GenerationConfig {
                provider: "openai".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-3.5-turbo".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                temperature: 0.0,
                timeout_secs: 60,
            },
            evaluation: EvaluationConfig {
                dataset_path: PathBuf::from("data/golden_dataset.json"),
                report_path: PathBuf::from("evaluation_report.json"),
                judge_model: "gpt-4-turbo".to_string(),
                min_pass_rate: 75.0,
                max_concurrent: 1,
                thresholds: DEFAULT_THRESHOLDS
                    .iter()
                    .map(|(m, t)| (m.as_str().to_string(), *t))
                    .collect(),
            },
            gate: GateConfig {
                degradation_threshold: 0.05,
                metrics: Metric::ALL.iter().map(|m| m.as_str().to_string()).collect(),
            },
            profiles: HashMap::new(),
        }
    }
}
