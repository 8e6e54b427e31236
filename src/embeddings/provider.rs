// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Capability interface for text embedding backends.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from an embedding backend.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// The backing model failed to load or the service is unreachable.
    /// Fatal for the provider instance, not retryable.
    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// The backend returned something other than one vector per input text.
    #[error("Embedding response misaligned: sent {sent} texts, got {got} vectors")]
    ResponseMisaligned { sent: usize, got: usize },

    /// A vector came back with the wrong dimensionality.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Transport-level failure on a single call (timeout, connection reset).
    #[error("Embedding request failed: {0}")]
    RequestFailed(String),
}

impl EmbeddingError {
    pub fn error_code(&self) -> &'static str {
        match self {
            EmbeddingError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            EmbeddingError::ResponseMisaligned { .. } => "RESPONSE_MISALIGNED",
            EmbeddingError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            EmbeddingError::RequestFailed(_) => "REQUEST_FAILED",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, EmbeddingError::RequestFailed(_))
    }
}

/// Turns text into fixed-dimension vectors.
///
/// Contract: `embed` returns one vector per input text, index-aligned,
/// each of `dimension()` length, deterministic for a fixed model version.
/// Construction of an implementation performs the one-time model
/// acquisition; a provider that failed to construct never exists, so every
/// live provider can embed.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Fixed output dimensionality of this provider.
    fn dimension(&self) -> usize;

    /// Model identifier, surfaced on the status endpoint.
    fn model_name(&self) -> &str;

    /// Convenience wrapper for the single-query case.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed(std::slice::from_ref(&text.to_string())).await?;
        vectors
            .pop()
            .ok_or(EmbeddingError::ResponseMisaligned { sent: 1, got: 0 })
    }
}
