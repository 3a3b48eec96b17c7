//! Scored chunk structures returned by retrieval

use crate::ingest::Chunk;
use serde::{Deserialize, Serialize};

/// A retrieved chunk with its similarity score and index position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// The chunk as stored in the index
    pub chunk: Chunk,

    /// Similarity to the query under the index metric (higher is better)
    pub score: f32,

    /// Insertion position in the index, used for stable tie-breaking
    pub position: usize,
}

impl ScoredChunk {
    pub fn new(chunk: Chunk, score: f32, position: usize) -> Self {
        Self {
            chunk,
            score,
            position,
        }
    }

    pub fn text(&self) -> &str {
        &self.chunk.text
    }

    /// Get a short preview of the text (first N characters)
    pub fn preview(&self, max_chars: usize) -> String {
        preview(&self.chunk.text, max_chars)
    }
}

/// First `max_chars` characters of `text`, with "..." when truncated
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

/// Chunks retrieved for one query, best match first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    chunks: Vec<ScoredChunk>,
}

impl RetrievalResult {
    pub fn new(chunks: Vec<ScoredChunk>) -> Self {
        Self { chunks }
    }

    pub fn chunks(&self) -> &[ScoredChunk] {
        &self.chunks
    }

    /// Chunk texts in rank order
    pub fn texts(&self) -> Vec<String> {
        self.chunks.iter().map(|c| c.chunk.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredChunk> {
        self.chunks.iter()
    }
}

impl IntoIterator for RetrievalResult {
    type Item = ScoredChunk;
    type IntoIter = std::vec::IntoIter<ScoredChunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.into_iter()
    }
}
