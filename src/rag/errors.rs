// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the retrieval + grounding pipeline.
//!
//! Two failure classes never appear here because they are fail-soft by
//! contract: retrieval degradation (empty result set, see `Retriever`) and
//! generation degradation (fixed error sentence, see `Answerer`).
//! Everything that does surface is typed.

use thiserror::Error;

use crate::embeddings::EmbeddingError;
use crate::ingest::IngestError;
use crate::vector::IndexError;

/// Errors surfaced by the knowledge-base and session services.
#[derive(Error, Debug)]
pub enum RagError {
    /// Embedding or generation backend failed to come up. Fatal at
    /// startup; requests made before initialization completes see
    /// service-unavailable.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Passage/vector count mismatch on upsert. Programmer error.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Chunking produced zero fragments; nothing was stored.
    #[error("No content extracted from document '{filename}'")]
    EmptyDocument { filename: String },

    /// Upload could not be extracted, propagated unchanged from the
    /// chunking collaborator.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// An indexing path needed embeddings and the provider refused.
    /// Unlike query-time retrieval this is NOT fail-soft: an upload whose
    /// chunks cannot be embedded must be rejected, not silently empty.
    #[error("Embedding failed while indexing: {0}")]
    IndexingEmbedFailed(#[from] EmbeddingError),

    /// Full-corpus rebuild failed mid-way. The persistent index is left in
    /// its last-known-good state; the caller removes the newly saved file.
    #[error("Persistent indexing failed: {0}")]
    PersistentIndexingFailure(String),
}

impl RagError {
    /// Stable code for logs and API error payloads.
    pub fn error_code(&self) -> &'static str {
        match self {
            RagError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            RagError::Index(e) => e.error_code(),
            RagError::EmptyDocument { .. } => "EMPTY_DOCUMENT",
            RagError::Ingest(e) => e.error_code(),
            RagError::IndexingEmbedFailed(_) => "INDEXING_EMBED_FAILED",
            RagError::PersistentIndexingFailure(_) => "PERSISTENT_INDEXING_FAILURE",
        }
    }

    /// User-facing message for API responses.
    pub fn user_message(&self) -> String {
        match self {
            RagError::ProviderUnavailable(_) => {
                "The service is still starting up, try again shortly".to_string()
            }
            RagError::EmptyDocument { filename } => {
                format!("No content could be extracted from '{filename}'")
            }
            RagError::Ingest(e) => e.user_message(),
            _ => self.to_string(),
        }
    }
}
