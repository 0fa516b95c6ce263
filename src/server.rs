//! Thin HTTP surface over the query and ingestion pipelines.
//!
//! Handlers do nothing but translate between the wire and the core: fatal
//! pipeline errors map to a 500 with the failure message, degraded outcomes
//! are already plain success responses by the time they arrive here.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::embeddings::{Embedder, GeminiEmbeddings};
use crate::engine::QueryOrchestrator;
use crate::generation::{AnswerGenerator, GeminiCompletion};
use crate::ingestion::IngestionPipeline;
use crate::sessions::SessionSink;
use crate::stores::QdrantStore;
use crate::types::{QueryRequest, RagError};

/// Long-lived clients and pipelines, built once at startup and shared by
/// every request handler.
pub struct AppContext {
    pub orchestrator: QueryOrchestrator,
    pub pipeline: IngestionPipeline,
    pub store: QdrantStore,
    pub docs_dir: PathBuf,
}

impl AppContext {
    /// Wires the pipelines from resolved configuration.
    pub fn build(config: &Config, sink: Arc<dyn SessionSink>) -> Result<Self, RagError> {
        let http = reqwest::Client::new();

        let store = QdrantStore::new(
            http.clone(),
            config.qdrant_url.clone(),
            config.qdrant_api_key.clone(),
            config.collection_name.clone(),
            config.embedding_dimension,
        );
        let embedder = Embedder::new(Arc::new(GeminiEmbeddings::new(
            http.clone(),
            config.gemini_base_url.clone(),
            config.gemini_api_key.clone(),
            config.embedding_model.clone(),
            config.embedding_dimension,
        )));
        let generator = AnswerGenerator::new(Arc::new(GeminiCompletion::new(
            http,
            config.gemini_base_url.clone(),
            config.gemini_api_key.clone(),
            config.completion_model.clone(),
        )));

        let backend = Arc::new(store.clone());
        Ok(Self {
            orchestrator: QueryOrchestrator::new(
                embedder.clone(),
                backend.clone(),
                generator,
                sink,
            ),
            pipeline: IngestionPipeline::new(embedder, backend),
            store,
            docs_dir: config.docs_dir.clone(),
        })
    }
}

/// Fatal pipeline failure surfaced to the client.
struct ApiError(RagError);

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": self.0.to_string() })),
        )
            .into_response()
    }
}

/// Builds the application router with permissive CORS.
pub fn router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/query", post(query))
        .route("/embed-documents", post(embed_documents))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(context)
}

async fn root() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "RAG API running" }))
}

async fn query(
    State(context): State<Arc<AppContext>>,
    Json(request): Json<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = context.orchestrator.handle(&request).await?;
    Ok(Json(response))
}

async fn embed_documents(
    State(context): State<Arc<AppContext>>,
) -> Result<Json<Value>, ApiError> {
    let summary = context.pipeline.ingest_directory(&context.docs_dir).await?;
    Ok(Json(json!({
        "status": "success",
        "message": format!(
            "Documents embedded and stored successfully ({} embeddings)",
            summary.chunks_stored
        ),
    })))
}

async fn health(State(context): State<Arc<AppContext>>) -> Result<Json<Value>, ApiError> {
    let info = context.store.collection_info().await?;
    let dimension = match info.dimension {
        Some(size) => json!(size),
        None => json!("unknown"),
    };
    Ok(Json(json!({
        "status": "healthy",
        "points_count": info.points_count,
        "dimension": dimension,
    })))
}
