//! The query orchestrator: two mutually exclusive answering modes.
//!
//! A request carrying non-blank `selected_text` is answered from that text
//! verbatim and never touches the vector store. Every other request runs the
//! retrieval path: embed the query, search the collection, pack the ranked
//! texts into the context budget, and generate a grounded answer. There is no
//! fallback from one mode to the other within a request.

use std::sync::Arc;

use tracing::{info, warn};

use crate::context::assemble;
use crate::embeddings::Embedder;
use crate::generation::AnswerGenerator;
use crate::stores::VectorBackend;
use crate::types::{QueryRequest, QueryResponse, RagError, SearchResult, SourceType};

use crate::sessions::SessionSink;

/// Answer returned when retrieval yields no usable results.
pub const NO_RELEVANT_INFORMATION_ANSWER: &str =
    "I could not find relevant information in the documentation.";

/// Source label attached to the manufactured selected-text result.
pub const SELECTED_TEXT_SOURCE: &str = "user_selected_text";

/// Coordinates embedding, retrieval, context assembly, generation, and
/// logging for one query request at a time.
#[derive(Clone)]
pub struct QueryOrchestrator {
    embedder: Embedder,
    backend: Arc<dyn VectorBackend>,
    generator: AnswerGenerator,
    sink: Arc<dyn SessionSink>,
}

impl QueryOrchestrator {
    pub fn new(
        embedder: Embedder,
        backend: Arc<dyn VectorBackend>,
        generator: AnswerGenerator,
        sink: Arc<dyn SessionSink>,
    ) -> Self {
        Self {
            embedder,
            backend,
            generator,
            sink,
        }
    }

    /// Answers one request.
    ///
    /// Degraded outcomes (embedding fallback, empty retrieval, generation
    /// failure, unavailable persistence) still return `Ok`; only a fatal
    /// vector-store failure or a configuration error surfaces as `Err`.
    pub async fn handle(&self, request: &QueryRequest) -> Result<QueryResponse, RagError> {
        info!(query = %request.query, "handling query");
        let session_id = self.sink.create_session().await;

        let selected = request
            .selected_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty());
        match selected {
            Some(selected_text) => {
                self.answer_from_selected_text(request, selected_text, session_id)
                    .await
            }
            None => self.answer_from_retrieval(request, session_id).await,
        }
    }

    async fn answer_from_selected_text(
        &self,
        request: &QueryRequest,
        selected_text: &str,
        session_id: Option<i64>,
    ) -> Result<QueryResponse, RagError> {
        info!("answering from user-selected text");
        let answer = self.generator.generate(&request.query, selected_text).await;

        if let Some(session_id) = session_id {
            self.sink
                .save_message(
                    session_id,
                    &request.query,
                    &answer,
                    true,
                    SourceType::SelectedText,
                )
                .await;
            self.sink
                .save_selected_text(session_id, selected_text)
                .await;
        }

        Ok(QueryResponse {
            answer,
            relevant_docs: vec![SearchResult {
                text: selected_text.to_string(),
                source: SELECTED_TEXT_SOURCE.to_string(),
                score: 1.0,
            }],
        })
    }

    async fn answer_from_retrieval(
        &self,
        request: &QueryRequest,
        session_id: Option<i64>,
    ) -> Result<QueryResponse, RagError> {
        let outcome = self.embedder.embed(&request.query).await?;
        if outcome.fallback {
            warn!("query embedding fell back to a random vector, retrieval is degraded");
        }

        let results = self.backend.query(&outcome.vector, request.top_k).await?;

        if results.is_empty() {
            info!("no usable retrieval results");
            let answer = NO_RELEVANT_INFORMATION_ANSWER.to_string();
            if let Some(session_id) = session_id {
                self.sink
                    .save_message(session_id, &request.query, &answer, false, SourceType::Qdrant)
                    .await;
            }
            return Ok(QueryResponse {
                answer,
                relevant_docs: Vec::new(),
            });
        }

        let ranked_texts: Vec<String> = results.iter().map(|r| r.text.clone()).collect();
        let context = assemble(&ranked_texts, request.max_context_length);
        let answer = self.generator.generate(&request.query, &context).await;

        if let Some(session_id) = session_id {
            let message_id = self
                .sink
                .save_message(session_id, &request.query, &answer, false, SourceType::Qdrant)
                .await;
            if let Some(message_id) = message_id {
                // Every retained result is logged, whether or not its text
                // fit the context budget.
                for result in &results {
                    self.sink
                        .save_retrieval_log(
                            session_id,
                            message_id,
                            None,
                            result.score,
                            &result.source,
                            &result.text,
                        )
                        .await;
                }
            }
        }

        Ok(QueryResponse {
            answer,
            relevant_docs: results,
        })
    }
}
