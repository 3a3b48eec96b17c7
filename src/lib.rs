//! Ragops - retrieval-augmented question answering with quality gates
//!
//! Ingests a source document into a persisted vector index, answers questions
//! grounded in the retrieved chunks, scores the system against a golden
//! dataset, and compares evaluation runs to block regressions.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod evaluation;
pub mod gate;
pub mod generation;
pub mod ingest;
pub mod pipeline;
pub mod retrieval;

pub use error::{RagError, Result};
