//! Retrieval
//!
//! Wraps the loaded vector index with the query-time embedding model, a
//! fixed `k` and the index's similarity metric.

mod provenance;

pub use provenance::{preview, RetrievalResult, ScoredChunk};

use crate::embedding::{EmbeddingProvider, SimilarityMetric, VectorIndex};
use crate::error::{RagError, Result};
use std::sync::Arc;

/// Default number of chunks retrieved per query
pub const DEFAULT_TOP_K: usize = 4;

/// Nearest-neighbour retriever over a read-only index
///
/// The index is shared behind an `Arc` and never mutated, so one retriever
/// can serve concurrent queries without locking.
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl Retriever {
    /// Create a retriever, checking that the embedder and metric match the
    /// ones the index was built with
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        metric: SimilarityMetric,
        top_k: usize,
    ) -> Result<Self> {
        let meta = index.metadata();

        if !meta
            .embedding_model_id
            .eq_ignore_ascii_case(embedder.model_name())
        {
            return Err(RagError::IndexIncompatible {
                reason: format!(
                    "index was built with embedding model '{}' but queries use '{}'",
                    meta.embedding_model_id,
                    embedder.model_name()
                ),
            });
        }

        if meta.dimension != embedder.dimension() {
            return Err(RagError::IndexIncompatible {
                reason: format!(
                    "index dimension is {} but the query embedder produces {}",
                    meta.dimension,
                    embedder.dimension()
                ),
            });
        }

        if meta.metric != metric {
            return Err(RagError::IndexIncompatible {
                reason: format!(
                    "index was built for {} similarity but {} was requested",
                    meta.metric, metric
                ),
            });
        }

        if top_k == 0 {
            return Err(RagError::InvalidInput("top_k must be greater than 0".to_string()));
        }

        Ok(Self {
            index,
            embedder,
            top_k,
        })
    }

    /// The configured number of chunks per query
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Retrieve the `k` chunks most similar to `query`, best first.
    ///
    /// Equal scores keep index insertion order, so repeated calls return the
    /// same sequence. Asking for more chunks than exist returns all of them.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidInput(
                "Query text cannot be empty".to_string(),
            ));
        }

        let query_embedding = self.embedder.embed(query)?;
        if query_embedding.len() != self.index.dimension() {
            return Err(RagError::IndexIncompatible {
                reason: format!(
                    "query embedding has {} dimensions, index has {}",
                    query_embedding.len(),
                    self.index.dimension()
                ),
            });
        }

        let hits = self.index.search(&query_embedding, k)?;

        let chunks = hits
            .into_iter()
            .filter_map(|hit| {
                self.index
                    .get(hit.position)
                    .map(|entry| ScoredChunk::new(entry.chunk.clone(), hit.score, hit.position))
            })
            .collect();

        let result = RetrievalResult::new(chunks);
        tracing::debug!("Retrieved {} chunks for query", result.len());
        Ok(result)
    }

    /// Retrieve with the configured `top_k`
    pub fn retrieve_top(&self, query: &str) -> Result<RetrievalResult> {
        self.retrieve(query, self.top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingError, IndexMetadata};
    use crate::ingest::Chunk;

    /// Maps each known keyword to one axis
    struct KeywordEmbedder {
        name: &'static str,
    }

    const KEYWORDS: [&str; 4] = ["cat", "dog", "fish", "bird"];

    impl EmbeddingProvider for KeywordEmbedder {
        fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            let lower = text.to_lowercase();
            Ok(KEYWORDS
                .iter()
                .map(|k| lower.matches(k).count() as f32)
                .collect())
        }

        fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
            texts.iter().map(|t| self.embed(t)).collect()
        }

        fn dimension(&self) -> usize {
            KEYWORDS.len()
        }

        fn model_name(&self) -> &str {
            self.name
        }
    }

    fn build_index(texts: &[&str]) -> Arc<VectorIndex> {
        let embedder = KeywordEmbedder { name: "keywords" };
        let mut index = VectorIndex::new(IndexMetadata::new("keywords", KEYWORDS.len()));
        for (i, text) in texts.iter().enumerate() {
            let chunk = Chunk {
                text: text.to_string(),
                source_offset: i * 100,
                source_length: text.len(),
                page: 1,
            };
            index.insert(chunk, embedder.embed(text).unwrap()).unwrap();
        }
        Arc::new(index)
    }

    fn retriever(index: Arc<VectorIndex>) -> Retriever {
        Retriever::new(
            index,
            Arc::new(KeywordEmbedder { name: "keywords" }),
            SimilarityMetric::Cosine,
            DEFAULT_TOP_K,
        )
        .unwrap()
    }

    #[test]
    fn test_retrieves_most_similar_first() {
        let index = build_index(&["dog park", "cat nap", "fish tank", "cat and dog"]);
        let result = retriever(index).retrieve("cat", 2).unwrap();
        assert_eq!(result.texts(), vec!["cat nap", "cat and dog"]);
        assert!(result.chunks()[0].score >= result.chunks()[1].score);
    }

    #[test]
    fn test_retrieval_is_deterministic() {
        let index = build_index(&["cat", "cat", "dog", "cat", "bird"]);
        let retriever = retriever(index);
        let first = retriever.retrieve_top("cat").unwrap();
        for _ in 0..5 {
            assert_eq!(retriever.retrieve_top("cat").unwrap(), first);
        }
        let positions: Vec<usize> = first.iter().map(|c| c.position).collect();
        assert_eq!(positions[..3], [0, 1, 3]);
    }

    #[test]
    fn test_k_beyond_index_size() {
        let index = build_index(&["cat", "dog"]);
        let result = retriever(index).retrieve("cat", 10).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_model_mismatch_is_incompatible() {
        let index = build_index(&["cat"]);
        let result = Retriever::new(
            index,
            Arc::new(KeywordEmbedder { name: "other-model" }),
            SimilarityMetric::Cosine,
            4,
        );
        assert!(matches!(result, Err(RagError::IndexIncompatible { .. })));
    }

    #[test]
    fn test_metric_mismatch_is_incompatible() {
        let index = build_index(&["cat"]);
        let result = Retriever::new(
            index,
            Arc::new(KeywordEmbedder { name: "keywords" }),
            SimilarityMetric::L2,
            4,
        );
        assert!(matches!(result, Err(RagError::IndexIncompatible { .. })));
    }

    #[test]
    fn test_empty_query_rejected() {
        let index = build_index(&["cat"]);
        assert!(matches!(
            retriever(index).retrieve("  ", 4),
            Err(RagError::InvalidInput(_))
        ));
    }
}
