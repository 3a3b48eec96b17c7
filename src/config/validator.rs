use crate::config::Config;
use crate::error::{RagError, Result, ValidationError};
use crate::evaluation::Metric;
use crate::ingest::{Chunker, ChunkingError};

/// Providers reachable through the OpenAI-compatible chat completions API
pub const VALID_PROVIDERS: [&str; 4] = ["openai", "ollama", "lmstudio", "openai-compatible"];

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every problem at once
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_ingestion(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_generation(config, &mut errors);
        Self::validate_evaluation(config, &mut errors);
        Self::validate_gate(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RagError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_ingestion(config: &Config, errors: &mut Vec<ValidationError>) {
        let ingestion = &config.ingestion;

        if let Err(e) = Chunker::with_boundaries(
            ingestion.chunk_size,
            ingestion.chunk_overlap,
            &ingestion.boundaries,
        ) {
            let path = match e {
                ChunkingError::ZeroChunkSize => "ingestion.chunk_size",
                ChunkingError::OverlapTooLarge { .. } => "ingestion.chunk_overlap",
                ChunkingError::InvalidBoundary { .. } => "ingestion.boundaries",
            };
            errors.push(ValidationError::new(path, e.to_string()));
        }

        if ingestion.source_path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "ingestion.source_path",
                "Source document path cannot be empty",
            ));
        }

        if ingestion.index_path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "ingestion.index_path",
                "Index path cannot be empty",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.retrieval.top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.top_k",
                "top_k must be greater than 0",
            ));
        }
    }

    fn validate_generation(config: &Config, errors: &mut Vec<ValidationError>) {
        let generation = &config.generation;

        let temp = generation.temperature;
        if !(0.0..=2.0).contains(&temp) {
            errors.push(ValidationError::new(
                "generation.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", temp),
            ));
        }

        let provider = generation.provider.as_str();
        if !VALID_PROVIDERS.contains(&provider) {
            errors.push(ValidationError::new(
                "generation.provider",
                format!(
                    "Provider must be one of {:?}, got '{}'",
                    VALID_PROVIDERS, provider
                ),
            ));
        }

        if generation.base_url.is_empty() {
            errors.push(ValidationError::new(
                "generation.base_url",
                "Base URL cannot be empty",
            ));
        }

        if generation.model.is_empty() {
            errors.push(ValidationError::new(
                "generation.model",
                "Model name cannot be empty",
            ));
        }
    }

    fn validate_evaluation(config: &Config, errors: &mut Vec<ValidationError>) {
        let evaluation = &config.evaluation;

        for (name, threshold) in &evaluation.thresholds {
            if name.parse::<Metric>().is_err() {
                errors.push(ValidationError::new(
                    format!("evaluation.thresholds.{name}"),
                    "Unknown metric",
                ));
            }
            if !(0.0..=1.0).contains(threshold) {
                errors.push(ValidationError::new(
                    format!("evaluation.thresholds.{name}"),
                    format!("Threshold must be between 0.0 and 1.0, got {}", threshold),
                ));
            }
        }

        if !(0.0..=100.0).contains(&evaluation.min_pass_rate) {
            errors.push(ValidationError::new(
                "evaluation.min_pass_rate",
                format!(
                    "Pass rate must be a percentage between 0 and 100, got {}",
                    evaluation.min_pass_rate
                ),
            ));
        }

        if evaluation.max_concurrent == 0 {
            errors.push(ValidationError::new(
                "evaluation.max_concurrent",
                "max_concurrent must be greater than 0",
            ));
        }

        if evaluation.judge_model.is_empty() {
            errors.push(ValidationError::new(
                "evaluation.judge_model",
                "Judge model cannot be empty",
            ));
        }
    }

    fn validate_gate(config: &Config, errors: &mut Vec<ValidationError>) {
        let threshold = config.gate.degradation_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            errors.push(ValidationError::new(
                "gate.degradation_threshold",
                format!("Threshold must be a non-negative number, got {}", threshold),
            ));
        }

        if config.gate.metrics.is_empty() {
            errors.push(ValidationError::new(
                "gate.metrics",
                "At least one metric must be compared",
            ));
        }
    }
}
