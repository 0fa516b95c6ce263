//! Environment-driven configuration, collected once at startup.

use std::env;
use std::path::PathBuf;

use crate::types::RagError;

/// Default Gemini REST endpoint.
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Everything the process needs, resolved from the environment.
///
/// Two query-embedding model identifiers have circulated for collections like
/// this one (`text-embedding-004` and the older `embedding-001`); the model
/// must match the one the deployed collection was ingested with, so it is
/// configuration rather than a constant.
#[derive(Clone, Debug)]
pub struct Config {
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub embedding_model: String,
    pub completion_model: String,
    pub embedding_dimension: usize,
    pub collection_name: String,
    pub database_url: Option<String>,
    pub docs_dir: PathBuf,
    pub bind_addr: String,
}

impl Config {
    /// Resolves configuration from the environment.
    ///
    /// `GEMINI_API_KEY` (or legacy `GEMINI_KEY`) is required; everything else
    /// has a default or is optional.
    pub fn from_env() -> Result<Self, RagError> {
        let gemini_api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("GEMINI_KEY"))
            .map_err(|_| {
                RagError::Config("GEMINI_API_KEY or GEMINI_KEY is required".to_string())
            })?;

        let embedding_dimension = match env::var("EMBEDDING_DIMENSION") {
            Ok(raw) => raw.parse::<usize>().map_err(|_| {
                RagError::Config(format!("EMBEDDING_DIMENSION is not a number: {raw}"))
            })?,
            Err(_) => 768,
        };

        Ok(Self {
            qdrant_url: env::var("QDRANT_URL")
                .unwrap_or_else(|_| "http://localhost:6333".to_string()),
            qdrant_api_key: env::var("QDRANT_API_KEY").ok(),
            gemini_api_key,
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-004".to_string()),
            completion_model: env::var("COMPLETION_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            embedding_dimension,
            collection_name: env::var("COLLECTION_NAME")
                .unwrap_or_else(|_| "docusaurus-rag".to_string()),
            database_url: env::var("DATABASE_URL").ok(),
            docs_dir: PathBuf::from(env::var("DOCS_DIR").unwrap_or_else(|_| "docs".to_string())),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string()),
        })
    }
}
