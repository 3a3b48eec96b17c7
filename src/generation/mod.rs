//! Generation service boundary
//!
//! The generator is a black box: prompt and temperature in, text out.
//! Failures are surfaced to the caller and never retried here.

mod openai;
mod prompt;

pub use openai::OpenAiGenerator;
pub use prompt::{PromptTemplate, DEFAULT_TEMPLATE, REFUSAL_PHRASE};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("API key environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Authentication rejected (HTTP {status}): {body}")]
    Unauthorized { status: u16, body: String },

    #[error("Rate limited (HTTP 429): {0}")]
    RateLimited(String),

    #[error("Service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Text generation service
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model identifier, reported in logs and evaluation reports
    fn model_name(&self) -> &str;

    /// Produce a completion for `prompt`
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, GenerationError>;
}
