//! The ingestion driver: directory scan → loader → chunker → embedder →
//! vector-store upsert.
//!
//! Files and chunks are processed strictly sequentially. A file that fails to
//! load is logged and skipped; a vector-store failure aborts the remaining
//! run, leaving the collection partially updated.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::{info, warn};

use crate::chunking::{ChunkingLimits, chunk_words};
use crate::embeddings::Embedder;
use crate::stores::{StoredPoint, VectorBackend};
use crate::types::{Chunk, RagError};

use super::loader::{SUPPORTED_EXTENSIONS, load_text};

/// Counters describing one ingestion run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestionSummary {
    pub files_processed: usize,
    pub files_skipped: usize,
    pub chunks_stored: usize,
    /// Chunks whose vector is random noise because the embedding call failed.
    pub fallback_embeddings: usize,
}

/// Drives the full corpus through loading, chunking, embedding, and upsert.
#[derive(Clone)]
pub struct IngestionPipeline {
    embedder: Embedder,
    backend: Arc<dyn VectorBackend>,
    limits: ChunkingLimits,
}

impl IngestionPipeline {
    pub fn new(embedder: Embedder, backend: Arc<dyn VectorBackend>) -> Self {
        Self {
            embedder,
            backend,
            limits: ChunkingLimits::default(),
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: ChunkingLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Ingests every supported file under `root`, recursively.
    pub async fn ingest_directory(&self, root: &Path) -> Result<IngestionSummary, RagError> {
        let files = collect_supported_files(root).await?;
        info!(root = %root.display(), files = files.len(), "starting corpus ingestion");

        let mut summary = IngestionSummary::default();
        if files.is_empty() {
            warn!(root = %root.display(), "no supported files found");
            return Ok(summary);
        }

        self.backend.ensure_collection().await?;

        let mut points = Vec::new();
        for path in &files {
            let text = match load_text(path).await {
                Ok(text) => text,
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "skipping file");
                    summary.files_skipped += 1;
                    continue;
                }
            };
            if text.trim().is_empty() {
                warn!(file = %path.display(), "skipping empty file");
                summary.files_skipped += 1;
                continue;
            }

            let source = path.to_string_lossy().into_owned();
            let segments = chunk_words(&text, self.limits);
            for (chunk_index, segment) in segments.iter().enumerate() {
                if segment.trim().is_empty() {
                    continue;
                }
                let chunk = Chunk::new(segment.as_str(), &source, chunk_index);
                let outcome = self.embedder.embed(&chunk.text).await?;
                if outcome.fallback {
                    summary.fallback_embeddings += 1;
                }
                points.push(StoredPoint::from_chunk(&chunk, outcome.vector));
            }
            summary.files_processed += 1;
        }

        summary.chunks_stored = points.len();
        self.backend.upsert(points).await?;

        info!(
            files = summary.files_processed,
            chunks = summary.chunks_stored,
            fallbacks = summary.fallback_embeddings,
            "ingestion finished"
        );
        Ok(summary)
    }
}

/// Collects supported files under `root` recursively, in sorted order.
async fn collect_supported_files(root: &Path) -> Result<Vec<PathBuf>, RagError> {
    let mut pending = vec![root.to_path_buf()];
    let mut files = Vec::new();

    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                let extension = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(str::to_ascii_lowercase)
                    .unwrap_or_default();
                if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
                    files.push(path);
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;
    use crate::types::SearchResult;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MemoryBackend {
        ensure_calls: Mutex<usize>,
        upserted: Mutex<Vec<StoredPoint>>,
    }

    #[async_trait]
    impl VectorBackend for MemoryBackend {
        async fn ensure_collection(&self) -> Result<(), RagError> {
            *self.ensure_calls.lock().unwrap() += 1;
            Ok(())
        }

        async fn upsert(&self, points: Vec<StoredPoint>) -> Result<(), RagError> {
            self.upserted.lock().unwrap().extend(points);
            Ok(())
        }

        async fn query(
            &self,
            _vector: &[f32],
            _limit: usize,
        ) -> Result<Vec<SearchResult>, RagError> {
            Ok(Vec::new())
        }
    }

    fn test_pipeline(backend: Arc<MemoryBackend>) -> IngestionPipeline {
        let embedder = Embedder::new(Arc::new(MockEmbeddingProvider::new(16)));
        IngestionPipeline::new(embedder, backend).with_limits(ChunkingLimits {
            min_words: 5,
            max_words: 8,
        })
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[tokio::test]
    async fn ingests_supported_files_and_skips_the_rest() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.md"), words(16)).unwrap();
        std::fs::write(dir.path().join("b.txt"), words(6)).unwrap();
        std::fs::write(dir.path().join("c.pdf"), "%PDF").unwrap();
        std::fs::write(dir.path().join("empty.txt"), "   ").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/d.txt"), words(7)).unwrap();

        let backend = Arc::new(MemoryBackend::default());
        let summary = test_pipeline(backend.clone())
            .ingest_directory(dir.path())
            .await
            .unwrap();

        // a.md splits into 8 + 8 at limits 5/8; b.txt and d.txt give one each.
        assert_eq!(summary.files_processed, 3);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.chunks_stored, 4);
        assert_eq!(summary.fallback_embeddings, 0);
        assert_eq!(*backend.ensure_calls.lock().unwrap(), 1);
        assert_eq!(backend.upserted.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn reingestion_produces_identical_point_ids() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("doc.txt"), words(20)).unwrap();

        let first = Arc::new(MemoryBackend::default());
        test_pipeline(first.clone())
            .ingest_directory(dir.path())
            .await
            .unwrap();
        let second = Arc::new(MemoryBackend::default());
        test_pipeline(second.clone())
            .ingest_directory(dir.path())
            .await
            .unwrap();

        let ids_first: Vec<u64> = first.upserted.lock().unwrap().iter().map(|p| p.id).collect();
        let ids_second: Vec<u64> =
            second.upserted.lock().unwrap().iter().map(|p| p.id).collect();
        assert!(!ids_first.is_empty());
        assert_eq!(ids_first, ids_second);
    }

    #[tokio::test]
    async fn empty_directory_yields_empty_summary_without_collection_calls() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(MemoryBackend::default());
        let summary = test_pipeline(backend.clone())
            .ingest_directory(dir.path())
            .await
            .unwrap();
        assert_eq!(summary, IngestionSummary::default());
        assert_eq!(*backend.ensure_calls.lock().unwrap(), 0);
    }
}
