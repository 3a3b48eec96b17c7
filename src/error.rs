use std::path::PathBuf;
use thiserror::Error;

use crate::embedding::{EmbeddingError, VectorIndexError};
use crate::evaluation::JudgeError;
use crate::generation::GenerationError;
use crate::ingest::ChunkingError;

/// Main error type for ragops
#[derive(Error, Debug)]
pub enum RagError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {}", format_validation(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// Chunking parameters rejected before any document is read
    #[error("Invalid chunking parameters: {0}")]
    InvalidChunking(#[from] ChunkingError),

    /// Source document missing
    #[error("Document not found at {path}. Place the source document there or pass --source")]
    DocumentNotFound { path: PathBuf },

    /// Source document unreadable or empty
    #[error("Malformed document {path}: {message}")]
    MalformedDocument { path: PathBuf, message: String },

    /// Persisted index missing
    #[error("Vector index not found at {path}. Run `ragops ingest` first")]
    IndexNotFound { path: PathBuf },

    /// Index built with a different embedding model, dimension or metric
    #[error("Vector index is incompatible with the query configuration: {reason}")]
    IndexIncompatible { reason: String },

    /// Vector index failures other than not-found or incompatibility
    #[error("Vector index error: {0}")]
    Index(String),

    /// Golden dataset missing
    #[error("Golden dataset not found at {path}. Create a JSON array of {{question, ground_truth_answer, ground_truth_context}} objects")]
    DatasetNotFound { path: PathBuf },

    /// Evaluation report missing
    #[error("Evaluation report not found at {path}. Run `ragops evaluate` first")]
    ReportNotFound { path: PathBuf },

    /// Embedding service failures
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Generation service failures, not retried
    #[error("Generation failed ({context}): {source}")]
    GenerationFailed {
        context: String,
        #[source]
        source: GenerationError,
    },

    /// Judging service failures
    #[error("Judging failed ({context}): {source}")]
    Judging {
        context: String,
        #[source]
        source: JudgeError,
    },

    /// Rejected caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<VectorIndexError> for RagError {
    fn from(err: VectorIndexError) -> Self {
        match err {
            VectorIndexError::IndexNotFound(path) => RagError::IndexNotFound { path },
            VectorIndexError::InvalidDimension { expected, actual } => {
                RagError::IndexIncompatible {
                    reason: format!("vector dimension {actual} does not match index dimension {expected}"),
                }
            }
            other => RagError::Index(other.to_string()),
        }
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.path, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for ragops operations
pub type Result<T> = std::result::Result<T, RagError>;
