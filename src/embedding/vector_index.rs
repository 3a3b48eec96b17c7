/// Exact (flat) vector index with on-disk persistence
use super::{cosine_similarity, l2_distance};
use crate::ingest::Chunk;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Bumped whenever the persisted layout changes
const FORMAT_VERSION: u32 = 1;
const ZSTD_LEVEL: i32 = 3;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Index not found: {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Insert failed: {0}")]
    InsertError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Index file is corrupted: {0}")]
    Corrupted(String),
}

/// Similarity metric used both at build time and at query time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    /// Cosine similarity, higher is more similar
    #[default]
    Cosine,
    /// Euclidean distance, reported as its negation so higher is still better
    L2,
}

impl SimilarityMetric {
    /// Similarity of `a` and `b`; larger means closer. Never NaN.
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        let score = match self {
            SimilarityMetric::Cosine => cosine_similarity(a, b),
            SimilarityMetric::L2 => -l2_distance(a, b),
        };
        if score.is_nan() {
            f32::NEG_INFINITY
        } else {
            score
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SimilarityMetric::Cosine => "cosine",
            SimilarityMetric::L2 => "l2",
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarityMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(SimilarityMetric::Cosine),
            "l2" | "euclidean" => Ok(SimilarityMetric::L2),
            other => Err(format!("unknown similarity metric '{other}' (expected cosine or l2)")),
        }
    }
}

/// Metadata stored alongside the vectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Embedding model that produced every vector
    pub embedding_model_id: String,
    pub dimension: usize,
    pub metric: SimilarityMetric,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Boundary patterns the chunker searched for cut points
    #[serde(default)]
    pub boundaries: Vec<String>,
    #[serde(default)]
    pub source_path: Option<PathBuf>,
    /// blake3 digest of the source document
    #[serde(default)]
    pub source_digest: Option<String>,
    #[serde(default)]
    pub page_count: usize,
    pub created_at: DateTime<Utc>,
}

impl IndexMetadata {
    pub fn new(embedding_model_id: impl Into<String>, dimension: usize) -> Self {
        Self {
            embedding_model_id: embedding_model_id.into(),
            dimension,
            metric: SimilarityMetric::default(),
            chunk_size: 0,
            chunk_overlap: 0,
            boundaries: Vec::new(),
            source_path: None,
            source_digest: None,
            page_count: 0,
            created_at: Utc::now(),
        }
    }
}

/// A chunk together with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Search result with insertion position and similarity score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    /// Insertion position of the chunk in the index
    pub position: usize,
    /// Similarity under the index metric (higher is more similar)
    pub score: f32,
}

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    format_version: u32,
    metadata: IndexMetadata,
    entries: Vec<EmbeddedChunk>,
}

/// Flat vector index
///
/// Search is an exact scan, so results are deterministic and ties keep
/// insertion order. The index is built once, saved, then loaded read-only;
/// rebuilding produces a new file that replaces the old one atomically.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    metadata: IndexMetadata,
    entries: Vec<EmbeddedChunk>,
}

impl VectorIndex {
    /// Create an empty index
    pub fn new(metadata: IndexMetadata) -> Self {
        Self {
            metadata,
            entries: Vec::new(),
        }
    }

    /// Load an index previously written by [`VectorIndex::save`]
    pub fn load(index_path: &Path) -> Result<Self, VectorIndexError> {
        if !index_path.exists() {
            return Err(VectorIndexError::IndexNotFound(index_path.to_path_buf()));
        }

        let compressed = std::fs::read(index_path)?;
        let raw = zstd::decode_all(compressed.as_slice())
            .map_err(|e| VectorIndexError::Corrupted(format!("decompression failed: {e}")))?;
        let persisted: PersistedIndex = serde_json::from_slice(&raw)
            .map_err(|e| VectorIndexError::Corrupted(format!("invalid index payload: {e}")))?;

        if persisted.format_version != FORMAT_VERSION {
            return Err(VectorIndexError::Corrupted(format!(
                "unsupported format version {} (expected {})",
                persisted.format_version, FORMAT_VERSION
            )));
        }

        let dimension = persisted.metadata.dimension;
        if let Some(bad) = persisted.entries.iter().find(|e| e.vector.len() != dimension) {
            return Err(VectorIndexError::InvalidDimension {
                expected: dimension,
                actual: bad.vector.len(),
            });
        }

        tracing::debug!(
            "Loaded vector index from {} ({} vectors, {}D, {})",
            index_path.display(),
            persisted.entries.len(),
            dimension,
            persisted.metadata.embedding_model_id
        );

        Ok(Self {
            metadata: persisted.metadata,
            entries: persisted.entries,
        })
    }

    /// Persist the index.
    ///
    /// Writes to a sibling temp file and renames it over `index_path`, so
    /// readers see either the old index or the complete new one.
    pub fn save(&self, index_path: &Path) -> Result<(), VectorIndexError> {
        let persisted = PersistedIndex {
            format_version: FORMAT_VERSION,
            metadata: self.metadata.clone(),
            entries: self.entries.clone(),
        };
        let raw = serde_json::to_vec(&persisted)
            .map_err(|e| VectorIndexError::SerializationError(e.to_string()))?;
        let compressed = zstd::encode_all(raw.as_slice(), ZSTD_LEVEL)?;

        if let Some(parent) = index_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file_name = index_path
            .file_name()
            .ok_or_else(|| {
                VectorIndexError::SerializationError(format!(
                    "index path has no file name: {}",
                    index_path.display()
                ))
            })?
            .to_string_lossy()
            .into_owned();
        let temp_path = index_path.with_file_name(format!(".{file_name}.tmp"));

        let written = std::fs::File::create(&temp_path).and_then(|mut file| {
            file.write_all(&compressed)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| std::fs::rename(&temp_path, index_path)) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }

        tracing::debug!(
            "Saved vector index to {} ({} vectors, {} bytes)",
            index_path.display(),
            self.entries.len(),
            compressed.len()
        );

        Ok(())
    }

    /// Append a chunk and its vector
    pub fn insert(&mut self, chunk: Chunk, vector: Vec<f32>) -> Result<(), VectorIndexError> {
        if vector.len() != self.metadata.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.metadata.dimension,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(VectorIndexError::InsertError(format!(
                "vector for chunk at offset {} contains non-finite values",
                chunk.source_offset
            )));
        }

        self.entries.push(EmbeddedChunk { chunk, vector });
        Ok(())
    }

    /// Insert multiple chunks in order
    pub fn insert_batch(
        &mut self,
        items: impl IntoIterator<Item = (Chunk, Vec<f32>)>,
    ) -> Result<(), VectorIndexError> {
        for (chunk, vector) in items {
            self.insert(chunk, vector)?;
        }
        Ok(())
    }

    /// Return up to `k` entries ranked by descending similarity.
    ///
    /// Ties are broken by insertion order. Asking for more results than the
    /// index holds returns every entry.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, VectorIndexError> {
        if query.len() != self.metadata.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.metadata.dimension,
                actual: query.len(),
            });
        }

        let metric = self.metadata.metric;
        let mut results: Vec<SearchResult> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| SearchResult {
                position,
                score: metric.score(query, &entry.vector),
            })
            .collect();

        // sort_by is stable, so equal scores stay in insertion order
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(k);

        Ok(results)
    }

    /// Entry at an insertion position
    pub fn get(&self, position: usize) -> Option<&EmbeddedChunk> {
        self.entries.get(position)
    }

    pub fn entries(&self) -> &[EmbeddedChunk] {
        &self.entries
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    /// Get the number of vectors in the index
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get vector dimension
    pub fn dimension(&self) -> usize {
        self.metadata.dimension
    }
}
