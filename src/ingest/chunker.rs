//! Overlapping, boundary-aware text chunking
//!
//! Chunks are measured in characters, not bytes. Every chunk except the last
//! ends at a cut point; the next chunk starts exactly `chunk_overlap`
//! characters before that cut, so adjacent chunks share `chunk_overlap`
//! characters and the document is covered without gaps.
//!
//! Cut points prefer semantic boundaries, tried in order: paragraph break,
//! sentence end, whitespace, and finally a hard cut at the window edge.
//! Boundaries are only searched for in the back half of the window so a
//! boundary near the start never produces a sliver chunk.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default boundary patterns, most preferred first
pub const DEFAULT_BOUNDARIES: [&str; 3] = [
    r"\n[ \t]*\n",          // paragraph
    r#"[.!?]["')\]]?\s+"#,  // sentence
    r"\s+",                 // word
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkingError {
    #[error("chunk_size must be greater than 0")]
    ZeroChunkSize,

    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },

    #[error("invalid boundary pattern '{pattern}': {message}")]
    InvalidBoundary { pattern: String, message: String },
}

/// A bounded segment of a source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text, verbatim from the source
    pub text: String,
    /// Offset of the first character within the source document (in chars)
    pub source_offset: usize,
    /// Length of the chunk in chars
    pub source_length: usize,
    /// 1-based page the chunk was cut from (0 when unpaginated)
    #[serde(default)]
    pub page: usize,
}

impl Chunk {
    /// Offset one past the last character
    pub fn source_end(&self) -> usize {
        self.source_offset + self.source_length
    }
}

/// Splits text into overlapping windows of `chunk_size` characters
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
    boundaries: Vec<Regex>,
}

impl Chunker {
    /// Create a chunker with the default paragraph/sentence/word boundaries
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        Self::with_boundaries(chunk_size, chunk_overlap, &DEFAULT_BOUNDARIES)
    }

    /// Create a chunker with custom boundary patterns, most preferred first
    pub fn with_boundaries<S: AsRef<str>>(
        chunk_size: usize,
        chunk_overlap: usize,
        patterns: &[S],
    ) -> Result<Self, ChunkingError> {
        Self::validate(chunk_size, chunk_overlap)?;

        let boundaries = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|e| ChunkingError::InvalidBoundary {
                    pattern: p.as_ref().to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            chunk_size,
            chunk_overlap,
            boundaries,
        })
    }

    /// Reject parameters that can never make progress
    pub fn validate(chunk_size: usize, chunk_overlap: usize) -> Result<(), ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::ZeroChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                size: chunk_size,
                overlap: chunk_overlap,
            });
        }
        Ok(())
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Lazily iterate over the chunks of `text`.
    ///
    /// The iterator is `Clone`, and calling `chunks` again restarts from the
    /// beginning.
    pub fn chunks<'a>(&'a self, text: &'a str) -> Chunks<'a> {
        let mut char_starts: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        char_starts.push(text.len());

        Chunks {
            chunker: self,
            text,
            char_starts,
            start: 0,
            done: false,
        }
    }

    /// Convenience wrapper collecting every chunk
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        self.chunks(text).collect()
    }
}

/// Iterator returned by [`Chunker::chunks`]
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    chunker: &'a Chunker,
    text: &'a str,
    /// Byte offset of every char, plus `text.len()` as a sentinel
    char_starts: Vec<usize>,
    /// Char index where the next chunk starts
    start: usize,
    done: bool,
}

impl Chunks<'_> {
    fn char_count(&self) -> usize {
        self.char_starts.len() - 1
    }

    /// Pick the end (exclusive, in chars) of the chunk starting at `self.start`
    fn find_cut(&self, window_end: usize) -> usize {
        let size = self.chunker.chunk_size;
        let overlap = self.chunker.chunk_overlap;

        // The cut must leave room for the next start to advance past this one
        let lo = (self.start + overlap + 1).max(self.start + size / 2);
        let window = &self.text[self.char_starts[self.start]..self.char_starts[window_end]];
        let base = self.char_starts[self.start];

        for boundary in &self.chunker.boundaries {
            let cut = boundary
                .find_iter(window)
                .filter_map(|m| self.char_starts.binary_search(&(base + m.end())).ok())
                .filter(|&end| end >= lo && end <= window_end)
                .last();
            if let Some(end) = cut {
                return end;
            }
        }

        window_end
    }
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let total = self.char_count();
        if self.done || self.start >= total {
            self.done = true;
            return None;
        }

        let window_end = self.start + self.chunker.chunk_size;
        let end = if window_end >= total {
            total
        } else {
            self.find_cut(window_end)
        };

        let chunk = Chunk {
            text: self.text[self.char_starts[self.start]..self.char_starts[end]].to_string(),
            source_offset: self.start,
            source_length: end - self.start,
            page: 0,
        };

        if end >= total {
            self.done = true;
        } else {
            self.start = end - self.chunker.chunk_overlap;
        }

        Some(chunk)
    }
}
