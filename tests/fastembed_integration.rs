//! Ingestion and retrieval with the real local embedding model
mod common;

use common::write_paged_document;
use ragops::embedding::{EmbeddingProvider, FastEmbedProvider, SimilarityMetric, VectorIndex};
use ragops::ingest::{ingest_document, IngestOptions, DEFAULT_BOUNDARIES};
use ragops::retrieval::Retriever;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
#[ignore] // Requires model download (~90MB) - run with: cargo test -- --ignored
fn test_fastembed_ingest_and_retrieve() {
    let temp = TempDir::new().unwrap();
    let source = write_paged_document(temp.path(), 10);
    let index_path = temp.path().join("index.json.zst");

    let options = IngestOptions {
        source_path: source,
        index_path: index_path.clone(),
        chunk_size: 1000,
        chunk_overlap: 200,
        boundaries: DEFAULT_BOUNDARIES.iter().map(|b| b.to_string()).collect(),
        metric: SimilarityMetric::Cosine,
        embedding_model: "all-MiniLM-L6-v2".to_string(),
        batch_size: 32,
        force: false,
    };

    let provider: Arc<dyn EmbeddingProvider> =
        Arc::new(FastEmbedProvider::with_default_model().unwrap());
    let summary = ingest_document(&options, || Ok(provider.clone())).unwrap();
    assert!(summary.chunks > 10);

    let index = Arc::new(VectorIndex::load(&index_path).unwrap());
    assert_eq!(index.dimension(), 384);

    let retriever = Retriever::new(index, provider, SimilarityMetric::Cosine, 4).unwrap();
    let first = retriever.retrieve_top("Tell me about beekeeping").unwrap();
    let second = retriever.retrieve_top("Tell me about beekeeping").unwrap();
    assert_eq!(first, second);
    assert!(first.chunks()[0].text().contains("beekeeping"));
}
