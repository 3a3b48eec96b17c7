/// Batched embedding of chunks into a fresh vector index
use super::{EmbeddingError, EmbeddingProvider, IndexMetadata, VectorIndex};
use crate::error::Result;
use crate::ingest::Chunk;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of an index build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStats {
    pub chunks: usize,
    pub batches: usize,
    pub duration_ms: u64,
}

/// Embeds chunks in fixed-size batches and collects them into an index
///
/// Any batch failure aborts the build.
pub struct IndexBuilder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl IndexBuilder {
    /// Create a new builder
    ///
    /// # Arguments
    /// * `provider` - Embedding provider, also recorded in the index metadata
    /// * `batch_size` - Number of chunks to embed in one call
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
        }
    }

    /// Embed every chunk and return the populated index.
    ///
    /// `metadata` supplies chunking and source details; model id and
    /// dimension are always taken from the provider.
    pub fn build(
        &self,
        chunks: Vec<Chunk>,
        mut metadata: IndexMetadata,
    ) -> Result<(VectorIndex, BuildStats)> {
        let start = std::time::Instant::now();
        let total = chunks.len();

        metadata.embedding_model_id = self.provider.model_name().to_string();
        metadata.dimension = self.provider.dimension();
        let mut index = VectorIndex::new(metadata);

        info!(
            "Embedding {} chunks with {} (batch size {})",
            total,
            self.provider.model_name(),
            self.batch_size
        );

        let mut batches = 0;
        for (batch_no, batch) in chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.provider.embed_batch(&texts)?;

            if embeddings.len() != batch.len() {
                return Err(EmbeddingError::GenerationError(format!(
                    "Embedding count mismatch in batch {}: expected {}, got {}",
                    batch_no,
                    batch.len(),
                    embeddings.len()
                ))
                .into());
            }

            index.insert_batch(batch.iter().cloned().zip(embeddings))?;
            batches += 1;
            debug!("Embedded batch {} ({}/{} chunks)", batch_no, index.len(), total);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!("Index build complete: {} vectors, {}ms", index.len(), duration_ms);

        Ok((
            index,
            BuildStats {
                chunks: total,
                batches,
                duration_ms,
            },
        ))
    }
}
