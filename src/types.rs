//! Core types shared across the retrieval and ingestion pipelines.
//!
//! This module defines the crate-wide error enum ([`RagError`]), the canonical
//! retrieval record ([`SearchResult`]) that every vector-store response shape
//! is normalized into, and the request/response types of the query path.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the ingestion and query pipelines.
///
/// Only a subset of failures ever reaches a caller: embedding failures are
/// masked by the fallback policy, completion failures collapse into a fixed
/// answer string, and malformed search records are skipped per item. The
/// variants here cover the remaining fatal or configuration-level cases.
#[derive(Debug, Error)]
pub enum RagError {
    /// The embedding provider call failed.
    #[error("embedding request failed: {0}")]
    Embedding(String),

    /// The vector store returned an error or an unrecognizable response.
    #[error("vector store error: {0}")]
    VectorStore(String),

    /// The completion provider call failed.
    #[error("generation failed: {0}")]
    Generation(String),

    /// A source file has an extension the loader does not understand.
    #[error("unsupported file extension: {0}")]
    UnsupportedFormat(String),

    /// Relational persistence failed in a way that is not maskable.
    #[error("storage error: {0}")]
    Storage(String),

    /// Startup configuration is invalid or incomplete.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A bounded word-window segment of a source document, the retrieval unit.
///
/// Chunks are immutable once produced by the ingestion pipeline. `text` is
/// capped at [`MAX_CHUNK_CHARS`] characters before it becomes a point payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Path-like identifier of the document this chunk was cut from.
    pub source: String,
    /// Zero-based position of this chunk within its source.
    pub chunk_index: usize,
}

/// Maximum number of characters a chunk payload may carry.
pub const MAX_CHUNK_CHARS: usize = 10_000;

impl Chunk {
    /// Creates a chunk, truncating `text` to [`MAX_CHUNK_CHARS`] characters.
    pub fn new(text: impl Into<String>, source: impl Into<String>, chunk_index: usize) -> Self {
        let mut text: String = text.into();
        if text.chars().count() > MAX_CHUNK_CHARS {
            text = text.chars().take(MAX_CHUNK_CHARS).collect();
        }
        Self {
            text,
            source: source.into(),
            chunk_index,
        }
    }
}

/// Canonical record produced by vector-store result normalization.
///
/// `score` is a similarity in the collection's metric space; the collection
/// uses cosine distance, so higher means more similar. Results surface to the
/// caller in the order the store ranked them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub text: String,
    pub source: String,
    pub score: f32,
}

/// Which context source answered a query, as recorded in the message log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceType {
    /// Context came from vector retrieval.
    Qdrant,
    /// Context was supplied verbatim by the user.
    SelectedText,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Qdrant => "qdrant",
            SourceType::SelectedText => "selected_text",
        }
    }
}

fn default_top_k() -> usize {
    5
}

fn default_max_context_length() -> usize {
    2000
}

/// A question posed against the corpus.
///
/// When `selected_text` is present and non-blank the query is answered from
/// that text verbatim and the vector store is never consulted.
#[derive(Clone, Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_context_length")]
    pub max_context_length: usize,
    #[serde(default)]
    pub selected_text: Option<String>,
}

impl QueryRequest {
    /// Convenience constructor with the wire defaults applied.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: default_top_k(),
            max_context_length: default_max_context_length(),
            selected_text: None,
        }
    }

    #[must_use]
    pub fn with_selected_text(mut self, text: impl Into<String>) -> Self {
        self.selected_text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_max_context_length(mut self, max_context_length: usize) -> Self {
        self.max_context_length = max_context_length;
        self
    }
}

/// The answer plus the retained retrieval records backing it.
#[derive(Clone, Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub relevant_docs: Vec<SearchResult>,
}
