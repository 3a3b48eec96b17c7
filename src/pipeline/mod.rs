//! Answer pipeline
//!
//! One question runs through three named steps: retrieve, compose, generate.
//! [`AnswerPipeline::trace`] returns every intermediate value so the chunks
//! reported as evidence are the exact ones the prompt was built from.

use crate::config::Config;
use crate::embedding::{EmbeddingProvider, FastEmbedProvider, VectorIndex};
use crate::error::{RagError, Result};
use crate::generation::{Generator, OpenAiGenerator, PromptTemplate};
use crate::retrieval::{preview, RetrievalResult, Retriever};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Generated answer with the chunk texts it was conditioned on, in rank order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub contexts: Vec<String>,
}

/// Every intermediate value of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineTrace {
    pub question: String,
    pub retrieved: RetrievalResult,
    pub prompt: String,
    pub text: String,
}

impl PipelineTrace {
    pub fn into_answer(self) -> Answer {
        Answer {
            contexts: self.retrieved.texts(),
            text: self.text,
        }
    }
}

/// Retriever, prompt template and generator wired together once at startup
/// and shared by handle with every caller
pub struct AnswerPipeline {
    retriever: Retriever,
    template: PromptTemplate,
    generator: Arc<dyn Generator>,
    temperature: f32,
}

impl AnswerPipeline {
    pub fn new(
        retriever: Retriever,
        template: PromptTemplate,
        generator: Arc<dyn Generator>,
        temperature: f32,
    ) -> Self {
        Self {
            retriever,
            template,
            generator,
            temperature,
        }
    }

    /// Build the pipeline from configuration.
    ///
    /// Loads the index, the query embedding model and the generation client
    /// up front so a missing index or API key fails here rather than on the
    /// first question.
    pub fn from_config(config: &Config) -> Result<Self> {
        let index_path = &config.ingestion.index_path;
        info!("Loading vector index from {}", index_path.display());
        let index = VectorIndex::load(index_path)?;
        info!(
            "Loaded {} chunks (model {}, {} dims, {})",
            index.len(),
            index.metadata().embedding_model_id,
            index.dimension(),
            index.metadata().metric
        );

        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(FastEmbedProvider::new(&config.embedding.model)?);

        let retriever = Retriever::new(
            Arc::new(index),
            embedder,
            config.retrieval.metric,
            config.retrieval.top_k,
        )?;

        let generator = OpenAiGenerator::from_config(&config.generation).map_err(|source| {
            RagError::GenerationFailed {
                context: format!("initialising {} client", config.generation.provider),
                source,
            }
        })?;

        Ok(Self::new(
            retriever,
            PromptTemplate::default(),
            Arc::new(generator),
            config.generation.temperature,
        ))
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn generator_model(&self) -> &str {
        self.generator.model_name()
    }

    /// Run one question and keep every intermediate value
    pub async fn trace(&self, question: &str) -> Result<PipelineTrace> {
        let retrieved = self.retriever.retrieve_top(question)?;
        debug!("Retrieved {} chunks", retrieved.len());

        let prompt = self.template.render(&retrieved, question);

        let text = self
            .generator
            .generate(&prompt, self.temperature)
            .await
            .map_err(|source| RagError::GenerationFailed {
                context: format!(
                    "model {} on question '{}'",
                    self.generator.model_name(),
                    preview(question, 60)
                ),
                source,
            })?;

        Ok(PipelineTrace {
            question: question.to_string(),
            retrieved,
            prompt,
            text,
        })
    }

    /// Generated text, returned verbatim
    pub async fn answer(&self, question: &str) -> Result<String> {
        Ok(self.trace(question).await?.text)
    }

    /// Generated text plus the chunk texts it was conditioned on
    pub async fn answer_with_evidence(&self, question: &str) -> Result<Answer> {
        Ok(self.trace(question).await?.into_answer())
    }
}
