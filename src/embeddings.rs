//! Embedding generation with an observable fallback policy.
//!
//! [`EmbeddingProvider`] is the seam to the external embedding service;
//! [`GeminiEmbeddings`] implements it against the Gemini REST API and
//! [`MockEmbeddingProvider`] gives deterministic vectors for tests.
//!
//! [`Embedder`] wraps a provider with the pipeline's failure policy: a failed
//! provider call never halts ingestion or a query. Instead a uniform-random
//! vector of the collection dimension is substituted and the substitution is
//! surfaced explicitly through [`EmbeddingOutcome::fallback`], so callers can
//! observe degraded retrieval instead of silently searching against noise.

use std::hash::Hasher;
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::RagError;

/// Maps text to a fixed-dimension dense vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a single text. One blocking round trip to the service.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;

    /// Vector length this provider produces.
    fn dimension(&self) -> usize;
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: String,
    content: ContentParts<'a>,
}

#[derive(Serialize)]
struct ContentParts<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Gemini `embedContent` client.
#[derive(Clone)]
pub struct GeminiEmbeddings {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl GeminiEmbeddings {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let url = format!(
            "{}/v1beta/models/{}:embedContent",
            self.base_url, self.model
        );
        let body = EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: ContentParts {
                parts: vec![TextPart { text }],
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?;

        if !response.status().is_success() {
            return Err(RagError::Embedding(format!(
                "embedContent returned {}",
                response.status()
            )));
        }

        let parsed: EmbedContentResponse = response
            .json()
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?;
        Ok(parsed.embedding.values)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic offline provider for tests and local development.
///
/// Vectors are derived from a hash of the input text, so identical texts map
/// to identical vectors across runs and processes.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut hasher = FxHasher::default();
        hasher.write(text.as_bytes());
        let mut state = hasher.finish() | 1;
        let vector = (0..self.dimension)
            .map(|_| {
                // xorshift keeps the sequence cheap and reproducible.
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state % 10_000) as f32 / 10_000.0
            })
            .collect();
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Result of an embedding attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingOutcome {
    pub vector: Vec<f32>,
    /// `true` when the provider failed and a random vector was substituted.
    pub fallback: bool,
}

/// Provider wrapper enforcing the pipeline's embedding failure policy.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    dimension: usize,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let dimension = provider.dimension();
        Self {
            provider,
            dimension,
        }
    }

    /// Collection-wide vector length this embedder enforces.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embeds `text`, substituting a random vector when the provider fails.
    ///
    /// The only error this returns is a dimension mismatch between the
    /// provider output and the collection, which is a configuration problem
    /// rather than a transient failure.
    pub async fn embed(&self, text: &str) -> Result<EmbeddingOutcome, RagError> {
        match self.provider.embed(text).await {
            Ok(vector) => {
                if vector.len() != self.dimension {
                    return Err(RagError::Config(format!(
                        "embedding dimension mismatch: provider returned {}, collection expects {}",
                        vector.len(),
                        self.dimension
                    )));
                }
                Ok(EmbeddingOutcome {
                    vector,
                    fallback: false,
                })
            }
            Err(err) => {
                warn!(error = %err, "embedding failed, substituting random fallback vector");
                let mut rng = rand::rng();
                let vector = (0..self.dimension)
                    .map(|_| rng.random_range(0.0f32..1.0))
                    .collect();
                Ok(EmbeddingOutcome {
                    vector,
                    fallback: true,
                })
            }
        }
    }
}
