//! Embedding & Indexing
//!
//! Local embedding generation and exact nearest-neighbour search.
//! - EmbeddingProvider trait for abstraction
//! - FastEmbedProvider for local embedding (all-MiniLM-L6-v2, 384-dim by default)
//! - VectorIndex: flat index persisted as zstd-compressed JSON
//! - IndexBuilder: batched embedding of chunks into a fresh index

mod batch;
mod provider;
mod vector_index;

pub use batch::{BuildStats, IndexBuilder};
pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};
pub use vector_index::{
    EmbeddedChunk, IndexMetadata, SearchResult, SimilarityMetric, VectorIndex, VectorIndexError,
};

/// Cosine similarity of two equal-length vectors. Zero vectors score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = mag_a * mag_b;
    if denom <= f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

/// Euclidean distance of two equal-length vectors
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
