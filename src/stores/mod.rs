//! Vector storage backends.
//!
//! [`VectorBackend`] abstracts the named collection the pipelines write to
//! and query against, so the orchestrator and ingestion code never touch a
//! concrete wire client. The only production implementation is the Qdrant
//! REST client in [`qdrant`]; tests substitute in-process doubles.

pub mod qdrant;

use std::hash::Hasher;

use async_trait::async_trait;
use rustc_hash::FxHasher;

use crate::types::{Chunk, RagError, SearchResult};

pub use qdrant::{CollectionInfo, QdrantStore};

/// One `(id, vector, payload)` triple destined for the collection.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub text: String,
    pub source: String,
}

impl StoredPoint {
    /// Builds a point from an embedded chunk.
    ///
    /// The id is derived deterministically from `(source, chunk_index)`, so
    /// re-ingesting the same document overwrites its own points instead of
    /// colliding with, or orphaning, points from other sources.
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: stable_point_id(&chunk.source, chunk.chunk_index),
            vector,
            text: chunk.text.clone(),
            source: chunk.source.clone(),
        }
    }
}

/// Deterministic 64-bit point id for a chunk of a source document.
pub fn stable_point_id(source: &str, chunk_index: usize) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(source.as_bytes());
    hasher.write_u8(0);
    hasher.write_usize(chunk_index);
    hasher.finish()
}

/// Unified interface over a vector collection.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Creates the collection if it does not exist. Idempotent; racing
    /// creators must not error when the collection already exists.
    async fn ensure_collection(&self) -> Result<(), RagError>;

    /// Writes points to the collection. Implementations may batch; batches
    /// are request-size control only, not transactional units.
    async fn upsert(&self, points: Vec<StoredPoint>) -> Result<(), RagError>;

    /// Nearest-neighbor query, returning at most `limit` results ranked by
    /// descending similarity.
    async fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<SearchResult>, RagError>;
}
