// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Generative answering constrained to retrieved context.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Apology the model is instructed to emit verbatim when the supplied
/// context cannot answer the question. Prompt-level contract, best-effort.
pub const CONTEXT_INSUFFICIENT_APOLOGY: &str =
    "I'm sorry, I couldn't find the answer in the provided study materials.";

/// Fixed sentence returned when the generation backend itself fails. The
/// caller always gets a string from `answer`, never an error.
pub const GENERATION_FAILURE_ANSWER: &str =
    "Error: Could not generate response due to a system error.";

/// Tuning knobs for raw generation calls (quiz path).
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: Option<usize>,
    /// Ask the backend for a JSON-typed response body.
    pub json_output: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_output_tokens: Some(1024),
            json_output: false,
        }
    }
}

#[derive(Error, Debug)]
pub enum AnswerError {
    #[error("Generation API key is required")]
    MissingApiKey,

    #[error("Generation request failed: {0}")]
    RequestFailed(String),

    #[error("Generation response malformed: {0}")]
    MalformedResponse(String),
}

/// A generative backend that answers questions from supplied context.
#[async_trait]
pub trait Answerer: Send + Sync {
    /// Grounded answer. Builds the fixed prompt binding {context,
    /// question}; any provider failure degrades to
    /// [`GENERATION_FAILURE_ANSWER`].
    async fn answer(&self, query: &str, context: &str) -> String;

    /// Unconstrained generation for callers that bring their own prompt.
    /// Errors here are NOT swallowed; the quiz path wants to distinguish
    /// backend failure from unparseable output.
    async fn generate_raw(
        &self,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<String, AnswerError>;

    /// Model identifier, surfaced on the status endpoint.
    fn model_name(&self) -> &str;
}

fn grounded_prompt(query: &str, context: &str) -> String {
    format!(
        "You are a helpful Study Buddy AI assistant. Use the following context to answer \
the question accurately and concisely.\n\
\n\
Context:\n\
{context}\n\
\n\
Question: {query}\n\
\n\
Answer: Provide a clear and informative answer based ONLY on the context above. If the \
context doesn't contain enough information to answer the question, politely say, \
'{CONTEXT_INSUFFICIENT_APOLOGY}'"
    )
}

// --- Gemini REST client -------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

/// Gemini `generateContent` client.
pub struct GeminiAnswerer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiAnswerer {
    pub const DEFAULT_BASE_URL: &'static str =
        "https://generativelanguage.googleapis.com/v1beta";

    pub fn new(
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AnswerError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(AnswerError::MissingApiKey);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnswerError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            api_key,
        })
    }

    /// Point at a different endpoint (proxies, self-hosted gateways).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, AnswerError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        );

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
                response_mime_type: options
                    .json_output
                    .then(|| "application/json".to_string()),
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnswerError::RequestFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| AnswerError::RequestFailed(e.to_string()))?;

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AnswerError::MalformedResponse(e.to_string()))?;

        let text: String = parsed
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AnswerError::MalformedResponse(
                "no candidates in response".to_string(),
            ));
        }

        Ok(text)
    }
}

#[async_trait]
impl Answerer for GeminiAnswerer {
    async fn answer(&self, query: &str, context: &str) -> String {
        let prompt = grounded_prompt(query, context);
        match self.generate(&prompt, &GenerationOptions::default()).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "generation failed, returning fixed error answer");
                GENERATION_FAILURE_ANSWER.to_string()
            }
        }
    }

    async fn generate_raw(
        &self,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<String, AnswerError> {
        self.generate(prompt, &options).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Deterministic answerer for tests and offline smoke runs: echoes the
/// question and the first line of context, or the apology when the context
/// is blank.
pub struct CannedAnswerer {
    model: String,
}

impl CannedAnswerer {
    pub fn new() -> Self {
        Self {
            model: "canned".to_string(),
        }
    }
}

impl Default for CannedAnswerer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Answerer for CannedAnswerer {
    async fn answer(&self, query: &str, context: &str) -> String {
        if context.trim().is_empty() {
            return CONTEXT_INSUFFICIENT_APOLOGY.to_string();
        }
        let first_line = context.lines().next().unwrap_or_default();
        format!("Q: {query} | grounded on: {first_line}")
    }

    async fn generate_raw(
        &self,
        _prompt: &str,
        _options: GenerationOptions,
    ) -> Result<String, AnswerError> {
        Ok("[]".to_string())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
