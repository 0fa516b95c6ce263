//! Grounded answer generation.
//!
//! [`AnswerGenerator`] renders the fixed grounding prompt and invokes a
//! [`CompletionProvider`]. Provider failures never escape this boundary: the
//! caller always receives an answer string, degraded to a fixed fallback
//! message when the model call fails.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::types::RagError;

/// Answer returned when the completion provider fails.
pub const GENERATION_FAILED_ANSWER: &str = "LLM failed to generate answer.";

/// Answer returned when the model responds with empty text.
pub const EMPTY_GENERATION_ANSWER: &str = "No answer generated.";

/// Bounded decoding settings for a completion call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 1024,
        }
    }
}

/// Seam to the external completion service.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, RagError>;
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiCompletion {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiCompletion {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for GeminiCompletion {
    async fn complete(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, RagError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|err| RagError::Generation(err.to_string()))?;

        if !response.status().is_success() {
            return Err(RagError::Generation(format!(
                "generateContent returned {}",
                response.status()
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| RagError::Generation(err.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();
        Ok(text)
    }
}

/// Renders the grounding prompt and calls the completion provider.
#[derive(Clone)]
pub struct AnswerGenerator {
    provider: Arc<dyn CompletionProvider>,
    options: GenerationOptions,
}

impl AnswerGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            options: GenerationOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Produces an answer grounded in `context`. Never fails.
    pub async fn generate(&self, query: &str, context: &str) -> String {
        let prompt = render_prompt(query, context);
        match self.provider.complete(&prompt, &self.options).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => EMPTY_GENERATION_ANSWER.to_string(),
            Err(err) => {
                error!(error = %err, "completion call failed");
                GENERATION_FAILED_ANSWER.to_string()
            }
        }
    }
}

/// The fixed grounding template instructing the model to answer strictly
/// from the supplied context.
fn render_prompt(query: &str, context: &str) -> String {
    format!(
        "You are a helpful assistant.\n\
         Use ONLY the context below to answer.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {query}\n\
         Answer:"
    )
}
