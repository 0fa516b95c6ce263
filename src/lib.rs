//! Retrieval-augmented question answering over a documentation corpus.
//!
//! ```text
//! Ingestion:
//!   directory scan ──► ingestion::loader ──► chunking::chunk_words
//!                                  │
//!                                  ▼
//!            embeddings::Embedder (observable fallback)
//!                                  │
//!                                  ▼
//!            stores::QdrantStore.upsert (batched, stable ids)
//!
//! Query:
//!   QueryRequest ──► engine::QueryOrchestrator
//!        ├─ selected text ─► verbatim context
//!        └─ retrieval ─► embed ─► stores query ─► normalize ─► context::assemble
//!                                  │
//!                                  ▼
//!            generation::AnswerGenerator ──► QueryResponse + sessions log
//! ```
//!
//! The vector-store client normalizes every recognized response shape into
//! one canonical [`types::SearchResult`]; everything downstream operates on
//! that single type. Degraded conditions (embedding fallback, empty
//! retrieval, completion failure, missing database) answer successfully
//! rather than erroring; only an unrecognizable store response is fatal.

pub mod chunking;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod engine;
pub mod generation;
pub mod ingestion;
pub mod server;
pub mod sessions;
pub mod stores;
pub mod types;

pub use chunking::{ChunkingLimits, chunk_words};
pub use context::assemble;
pub use embeddings::{Embedder, EmbeddingOutcome, EmbeddingProvider, MockEmbeddingProvider};
pub use engine::{NO_RELEVANT_INFORMATION_ANSWER, QueryOrchestrator, SELECTED_TEXT_SOURCE};
pub use generation::{AnswerGenerator, CompletionProvider, GenerationOptions};
pub use ingestion::{IngestionPipeline, IngestionSummary};
pub use sessions::{NoopSessionSink, SessionSink};
pub use stores::{QdrantStore, StoredPoint, VectorBackend};
pub use types::{Chunk, QueryRequest, QueryResponse, RagError, SearchResult, SourceType};
