//! Turning a documentation directory into searchable vector points.
//!
//! * [`loader`] — file-format-specific text extraction.
//! * [`pipeline`] — the loader → chunker → embedder → upsert driver.

pub mod loader;
pub mod pipeline;

pub use loader::{SUPPORTED_EXTENSIONS, load_text};
pub use pipeline::{IngestionPipeline, IngestionSummary};
