// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session-scoped ephemeral knowledge bases.
//!
//! Each session key owns at most one in-RAM vector index, built from a
//! single uploaded document and destroyed on delete or restart. Queries
//! that the active session cannot answer signal the caller to fall back to
//! the persistent knowledge base.

use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::answerer::Answerer;
use super::errors::RagError;
use super::service::CONTEXT_SEPARATOR;
use crate::embeddings::EmbeddingProvider;
use crate::ingest::extract_and_split;
use crate::vector::{EphemeralIndex, Passage, VectorIndex};

/// Session key used when the client does not supply one.
pub const DEFAULT_SESSION_KEY: &str = "temp_session";

/// Everything known about one active session. Immutable once built; a
/// re-index replaces the whole entry, so a concurrent reader holding the
/// old Arc keeps a consistent (pre-replace) view.
pub struct SessionEntry {
    pub index: Arc<EphemeralIndex>,
    pub filename: String,
    pub chunk_count: usize,
}

/// Point-in-time view of a session, served verbatim on the status endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionStatus {
    pub is_active: bool,
    pub filename: Option<String>,
    pub chunk_count: usize,
}

impl SessionStatus {
    fn absent() -> Self {
        Self {
            is_active: false,
            filename: None,
            chunk_count: 0,
        }
    }
}

/// Result of querying a session. `answer: None` is the fallback signal:
/// the caller should query the persistent knowledge base instead.
#[derive(Debug, Clone, Serialize)]
pub struct SessionAnswer {
    pub answer: Option<String>,
    pub source_file: Option<String>,
}

impl SessionAnswer {
    fn fall_back() -> Self {
        Self {
            answer: None,
            source_file: None,
        }
    }
}

/// Owns the table of active sessions.
///
/// The embedding provider is the same instance the persistent service
/// uses; sessions never load their own model. Entries are swapped whole
/// under a short write lock, so readers observe either the fully-old or
/// fully-new entry for a key and operations on different keys never block
/// on each other's indexing work.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<SessionEntry>>>,
    embedder: Arc<dyn EmbeddingProvider>,
    answerer: Arc<dyn Answerer>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SessionManager {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        answerer: Arc<dyn Answerer>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            embedder,
            answerer,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Chunk, embed, and index a document into a fresh ephemeral store for
    /// `session_key`, replacing any existing session under that key.
    ///
    /// Nothing is stored on failure: `EmptyDocument` when chunking yields
    /// zero fragments, and extraction/embedding errors propagate before
    /// the session table is touched.
    pub async fn index_session(
        &self,
        raw: &[u8],
        filename: &str,
        session_key: &str,
    ) -> Result<SessionStatus, RagError> {
        let chunks = extract_and_split(raw, filename, self.chunk_size, self.chunk_overlap)?;
        if chunks.is_empty() {
            return Err(RagError::EmptyDocument {
                filename: filename.to_string(),
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;

        let passages: Vec<Passage> = chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let mut metadata = chunk.metadata;
                if let Some(map) = metadata.as_object_mut() {
                    map.insert("is_temporary".to_string(), json!(true));
                }
                Passage {
                    id: format!("temp_{session_key}_{i}"),
                    text: chunk.text,
                    metadata,
                }
            })
            .collect();
        let chunk_count = passages.len();

        let index = Arc::new(EphemeralIndex::new());
        index.upsert(passages, vectors).await?;

        let entry = Arc::new(SessionEntry {
            index,
            filename: filename.to_string(),
            chunk_count,
        });

        // Single write-lock insert: replace is atomic with respect to
        // concurrent queries, and the old index becomes unreachable as
        // soon as the last in-flight reader drops its Arc.
        let replaced = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(session_key.to_string(), entry).is_some()
        };

        info!(
            session_key,
            filename, chunk_count, replaced, "ephemeral session indexed"
        );

        Ok(SessionStatus {
            is_active: true,
            filename: Some(filename.to_string()),
            chunk_count,
        })
    }

    /// Query the active session for `session_key`.
    ///
    /// Returns the fallback signal (`{None, None}`) when the session is
    /// absent or its index yields no context; the composing layer then
    /// queries the persistent knowledge base instead.
    pub async fn query_session(
        &self,
        query: &str,
        k: usize,
        session_key: &str,
    ) -> SessionAnswer {
        let entry = {
            let sessions = self.sessions.read().await;
            match sessions.get(session_key) {
                Some(entry) => entry.clone(),
                None => return SessionAnswer::fall_back(),
            }
        };

        let query_vector = match self.embedder.embed_one(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, session_key, "session query embedding failed, falling back");
                return SessionAnswer::fall_back();
            }
        };

        let results = match entry.index.search(&query_vector, k).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, session_key, "session search failed, falling back");
                return SessionAnswer::fall_back();
            }
        };

        let context = results
            .iter()
            .map(|r| r.passage.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        if context.is_empty() {
            return SessionAnswer::fall_back();
        }

        let answer = self.answerer.answer(query, &context).await;
        SessionAnswer {
            answer: Some(answer),
            source_file: Some(entry.filename.clone()),
        }
    }

    /// Drop the session for `session_key`. Idempotent: deleting an absent
    /// session is a no-op.
    pub async fn delete_session(&self, session_key: &str) {
        let removed = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(session_key).is_some()
        };
        if removed {
            info!(session_key, "ephemeral session deleted");
        }
    }

    /// Pure read of the session entry, all fields defaulted when absent.
    pub async fn status(&self, session_key: &str) -> SessionStatus {
        let sessions = self.sessions.read().await;
        match sessions.get(session_key) {
            Some(entry) => SessionStatus {
                is_active: true,
                filename: Some(entry.filename.clone()),
                chunk_count: entry.chunk_count,
            },
            None => SessionStatus::absent(),
        }
    }

    /// Keys of all active sessions, for the status endpoint.
    pub async fn active_keys(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        let mut keys: Vec<String> = sessions.keys().cloned().collect();
        keys.sort();
        keys
    }
}
