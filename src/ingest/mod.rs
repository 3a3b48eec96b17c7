//! Document ingestion
//!
//! Loads the source document, splits every page into overlapping chunks,
//! embeds them and writes a fresh vector index. Re-ingesting replaces the
//! previous index wholesale.

mod chunker;
mod document;

pub use chunker::{Chunk, Chunker, ChunkingError, Chunks, DEFAULT_BOUNDARIES};
pub use document::{Document, Page};

use crate::config::Config;
use crate::embedding::{EmbeddingProvider, IndexBuilder, IndexMetadata, SimilarityMetric, VectorIndex};
use crate::error::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Everything an ingestion run needs to know
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub source_path: PathBuf,
    pub index_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub boundaries: Vec<String>,
    pub metric: SimilarityMetric,
    pub embedding_model: String,
    pub batch_size: usize,
    /// Rebuild even when the existing index matches the source
    pub force: bool,
}

impl IngestOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            source_path: config.ingestion.source_path.clone(),
            index_path: config.ingestion.index_path.clone(),
            chunk_size: config.ingestion.chunk_size,
            chunk_overlap: config.ingestion.chunk_overlap,
            boundaries: config.ingestion.boundaries.clone(),
            metric: config.retrieval.metric,
            embedding_model: config.embedding.model.clone(),
            batch_size: config.embedding.batch_size,
            force: false,
        }
    }
}

/// Outcome of an ingestion run
#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub pages: usize,
    pub chunks: usize,
    pub embedding_model: String,
    pub index_path: PathBuf,
    /// True when the existing index already matched and nothing was rebuilt
    pub skipped: bool,
    /// Embedding batches sent to the model (0 when skipped)
    pub batches: usize,
    /// Time spent embedding
    pub embed_ms: u64,
    pub duration_ms: u64,
}

/// Chunk every page of a document, carrying document-level offsets and
/// page numbers. Chunks never straddle a page break.
///
/// Every chunk the chunker yields is kept, including whitespace-only ones,
/// so each page stays fully covered with the configured overlap.
pub fn chunk_document(chunker: &Chunker, document: &Document) -> Vec<Chunk> {
    document
        .pages
        .iter()
        .flat_map(|page| {
            chunker.chunks(&page.text).map(move |mut chunk| {
                chunk.source_offset += page.offset;
                chunk.page = page.number;
                chunk
            })
        })
        .collect()
}

/// Run a full ingestion.
///
/// Chunking parameters are validated before the document is read, and the
/// embedding model is only initialised once a rebuild is actually needed.
pub fn ingest_document<F>(options: &IngestOptions, provider_factory: F) -> Result<IngestSummary>
where
    F: FnOnce() -> Result<Arc<dyn EmbeddingProvider>>,
{
    let start = std::time::Instant::now();
    let chunker = Chunker::with_boundaries(
        options.chunk_size,
        options.chunk_overlap,
        &options.boundaries,
    )?;

    info!("Loading document from {}", options.source_path.display());
    let document = Document::load(&options.source_path)?;
    info!("Loaded {} pages", document.page_count());

    if !options.force {
        if let Some(existing) = up_to_date_index(options, &document) {
            info!(
                "Index at {} is up to date with the source, skipping rebuild",
                options.index_path.display()
            );
            return Ok(IngestSummary {
                pages: existing.metadata().page_count,
                chunks: existing.len(),
                embedding_model: existing.metadata().embedding_model_id.clone(),
                index_path: options.index_path.clone(),
                skipped: true,
                batches: 0,
                embed_ms: 0,
                duration_ms: start.elapsed().as_millis() as u64,
            });
        }
    }

    info!(
        "Splitting document into chunks (size={}, overlap={})",
        options.chunk_size, options.chunk_overlap
    );
    let chunks = chunk_document(&chunker, &document);
    info!("Created {} chunks", chunks.len());

    let provider = provider_factory()?;
    let mut metadata = IndexMetadata::new(provider.model_name(), provider.dimension());
    metadata.metric = options.metric;
    metadata.chunk_size = options.chunk_size;
    metadata.chunk_overlap = options.chunk_overlap;
    metadata.boundaries = options.boundaries.clone();
    metadata.source_path = Some(options.source_path.clone());
    metadata.source_digest = Some(document.digest.clone());
    metadata.page_count = document.page_count();

    let builder = IndexBuilder::new(provider.clone(), options.batch_size);
    let (index, stats) = builder.build(chunks, metadata)?;

    info!("Saving index to {}", options.index_path.display());
    index.save(&options.index_path)?;

    Ok(IngestSummary {
        pages: document.page_count(),
        chunks: index.len(),
        embedding_model: provider.model_name().to_string(),
        index_path: options.index_path.clone(),
        skipped: false,
        batches: stats.batches,
        embed_ms: stats.duration_ms,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// The existing index, if it was built from this exact source with the
/// same model and parameters
fn up_to_date_index(options: &IngestOptions, document: &Document) -> Option<VectorIndex> {
    if !options.index_path.exists() {
        return None;
    }

    let existing = match VectorIndex::load(&options.index_path) {
        Ok(index) => index,
        Err(e) => {
            tracing::warn!("Existing index unreadable, rebuilding: {}", e);
            return None;
        }
    };

    let meta = existing.metadata();
    let matches = meta.source_digest.as_deref() == Some(document.digest.as_str())
        && meta.chunk_size == options.chunk_size
        && meta.chunk_overlap == options.chunk_overlap
        && meta.boundaries == options.boundaries
        && meta.metric == options.metric
        && meta.embedding_model_id.eq_ignore_ascii_case(&options.embedding_model);

    matches.then_some(existing)
}
