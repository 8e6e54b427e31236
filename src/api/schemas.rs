// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::rag::{QuizQuestion, SessionStatus};
use crate::vector::ScoredPassage;

fn default_top_k() -> i64 {
    5
}

fn default_num_questions() -> usize {
    5
}

/// Body for `/query` and `/temp_query`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Number of passages to retrieve. Negative values are treated as 0.
    #[serde(default = "default_top_k")]
    pub top_k: i64,
    /// Session key for `/temp_query`; the shared default when omitted.
    #[serde(default)]
    pub session_key: Option<String>,
}

impl QueryRequest {
    /// `top_k` clamped into a usable range: `k <= 0` means zero results.
    pub fn k(&self) -> usize {
        self.top_k.max(0) as usize
    }
}

/// Answer without retrieval details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleQueryResponse {
    pub query: String,
    pub answer: String,
}

/// Answer with the passages it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct FullQueryResponse {
    pub query: String,
    pub answer: String,
    pub retrieved_passages: Vec<ScoredPassage>,
}

/// Query parameters for `/upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadParams {
    /// Persist to the main knowledge base instead of an ephemeral session.
    #[serde(default)]
    pub save_permanent: bool,
    #[serde(default)]
    pub session_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_indexed: Option<usize>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub embedding_model: String,
    pub generation_model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeStatusResponse {
    pub document_count: usize,
    pub embedding_model: String,
    pub generation_model: String,
    pub session: SessionStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct TempStatusResponse {
    pub is_active: bool,
    pub filename: Option<String>,
    pub chunk_count: usize,
    pub keys_in_store: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearTempResponse {
    pub status: String,
    pub message: String,
}

/// Body for `/quiz`.
#[derive(Debug, Clone, Deserialize)]
pub struct QuizRequest {
    pub topic: String,
    #[serde(default = "default_num_questions")]
    pub num_questions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizResponse {
    pub topic: String,
    pub questions: Vec<QuizQuestion>,
}
