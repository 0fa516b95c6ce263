//! Relational logging of query sessions.
//!
//! Every query request opens a session, records one message, and in retrieval
//! mode one log row per retained search result. Persistence is strictly
//! best-effort: when the database is unconfigured or a write fails, the sink
//! degrades to a no-op returning absent ids and the request still succeeds.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::types::{RagError, SourceType};

/// Sink for session, message, and retrieval-log rows.
///
/// All methods return `None` instead of erroring when persistence is
/// unavailable; callers gate follow-up writes on the returned ids.
#[async_trait]
pub trait SessionSink: Send + Sync {
    async fn create_session(&self) -> Option<i64>;

    async fn save_message(
        &self,
        session_id: i64,
        user_query: &str,
        llm_response: &str,
        is_selection_based: bool,
        source_type: SourceType,
    ) -> Option<i64>;

    async fn save_selected_text(&self, session_id: i64, selected_text: &str) -> Option<i64>;

    #[allow(clippy::too_many_arguments)]
    async fn save_retrieval_log(
        &self,
        session_id: i64,
        message_id: i64,
        chunk_id: Option<&str>,
        similarity_score: f32,
        source: &str,
        retrieved_text: &str,
    ) -> Option<i64>;
}

/// Sink used when no database is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSessionSink;

#[async_trait]
impl SessionSink for NoopSessionSink {
    async fn create_session(&self) -> Option<i64> {
        None
    }

    async fn save_message(
        &self,
        _session_id: i64,
        _user_query: &str,
        _llm_response: &str,
        _is_selection_based: bool,
        _source_type: SourceType,
    ) -> Option<i64> {
        None
    }

    async fn save_selected_text(&self, _session_id: i64, _selected_text: &str) -> Option<i64> {
        None
    }

    async fn save_retrieval_log(
        &self,
        _session_id: i64,
        _message_id: i64,
        _chunk_id: Option<&str>,
        _similarity_score: f32,
        _source: &str,
        _retrieved_text: &str,
    ) -> Option<i64> {
        None
    }
}

/// Postgres-backed sink over a bounded connection pool.
#[derive(Clone)]
pub struct PgSessionSink {
    pool: PgPool,
}

impl PgSessionSink {
    /// Connects and creates the log tables if they do not exist.
    pub async fn connect(database_url: &str) -> Result<Self, RagError> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        let sink = Self { pool };
        sink.create_tables().await?;
        info!("session log database ready");
        Ok(sink)
    }

    async fn create_tables(&self) -> Result<(), RagError> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS chat_sessions (
                id BIGSERIAL PRIMARY KEY,
                created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
            )",
            "CREATE TABLE IF NOT EXISTS chat_messages (
                id BIGSERIAL PRIMARY KEY,
                session_id BIGINT REFERENCES chat_sessions(id) ON DELETE CASCADE,
                user_query TEXT NOT NULL,
                llm_response TEXT NOT NULL,
                created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
                is_selection_based BOOLEAN DEFAULT FALSE,
                source_type VARCHAR(20) DEFAULT 'qdrant'
            )",
            "CREATE TABLE IF NOT EXISTS user_selected_text (
                id BIGSERIAL PRIMARY KEY,
                session_id BIGINT REFERENCES chat_sessions(id) ON DELETE CASCADE,
                selected_text TEXT NOT NULL,
                created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
            )",
            "CREATE TABLE IF NOT EXISTS retrieval_logs (
                id BIGSERIAL PRIMARY KEY,
                session_id BIGINT REFERENCES chat_sessions(id) ON DELETE CASCADE,
                message_id BIGINT REFERENCES chat_messages(id) ON DELETE CASCADE,
                chunk_id VARCHAR(255),
                similarity_score REAL,
                source TEXT,
                retrieved_text TEXT,
                created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
            )",
        ];
        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|err| RagError::Storage(err.to_string()))?;
        }
        Ok(())
    }

    /// Releases the pool's connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SessionSink for PgSessionSink {
    async fn create_session(&self) -> Option<i64> {
        let result = sqlx::query_scalar::<_, i64>(
            "INSERT INTO chat_sessions DEFAULT VALUES RETURNING id",
        )
        .fetch_one(&self.pool)
        .await;
        match result {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(error = %err, "failed to create session row");
                None
            }
        }
    }

    async fn save_message(
        &self,
        session_id: i64,
        user_query: &str,
        llm_response: &str,
        is_selection_based: bool,
        source_type: SourceType,
    ) -> Option<i64> {
        let result = sqlx::query_scalar::<_, i64>(
            "INSERT INTO chat_messages
             (session_id, user_query, llm_response, is_selection_based, source_type)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(session_id)
        .bind(user_query)
        .bind(llm_response)
        .bind(is_selection_based)
        .bind(source_type.as_str())
        .fetch_one(&self.pool)
        .await;
        match result {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(error = %err, "failed to save message row");
                None
            }
        }
    }

    async fn save_selected_text(&self, session_id: i64, selected_text: &str) -> Option<i64> {
        let result = sqlx::query_scalar::<_, i64>(
            "INSERT INTO user_selected_text (session_id, selected_text)
             VALUES ($1, $2)
             RETURNING id",
        )
        .bind(session_id)
        .bind(selected_text)
        .fetch_one(&self.pool)
        .await;
        match result {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(error = %err, "failed to save selected text row");
                None
            }
        }
    }

    async fn save_retrieval_log(
        &self,
        session_id: i64,
        message_id: i64,
        chunk_id: Option<&str>,
        similarity_score: f32,
        source: &str,
        retrieved_text: &str,
    ) -> Option<i64> {
        let result = sqlx::query_scalar::<_, i64>(
            "INSERT INTO retrieval_logs
             (session_id, message_id, chunk_id, similarity_score, source, retrieved_text)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(session_id)
        .bind(message_id)
        .bind(chunk_id)
        .bind(similarity_score)
        .bind(source)
        .bind(retrieved_text)
        .fetch_one(&self.pool)
        .await;
        match result {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(error = %err, "failed to save retrieval log row");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_sink_returns_absent_ids() {
        let sink = NoopSessionSink;
        assert_eq!(sink.create_session().await, None);
        assert_eq!(
            sink.save_message(1, "q", "a", false, SourceType::Qdrant).await,
            None
        );
        assert_eq!(sink.save_selected_text(1, "text").await, None);
        assert_eq!(
            sink.save_retrieval_log(1, 2, None, 0.5, "src", "text").await,
            None
        );
    }
}
