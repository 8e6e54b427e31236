// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! The persistent knowledge-base service: retrieval, grounding, and the
//! full-corpus rebuild path.

use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::answerer::Answerer;
use super::errors::RagError;
use super::retriever::Retriever;
use crate::embeddings::EmbeddingProvider;
use crate::ingest::{scan_corpus, DocumentChunk};
use crate::vector::{Passage, PersistentIndex, ScoredPassage, VectorIndex};

/// Separator between passages when they are joined into one context
/// string for the model.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Fixed answer when retrieval yields nothing. Returned without spending a
/// generation call.
pub const NO_MATERIALS_ANSWER: &str =
    "I'm sorry, I couldn't find any relevant study materials for your question.";

/// Full result of a grounded query.
#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub query: String,
    pub answer: String,
    pub retrieved: Vec<ScoredPassage>,
}

/// Owns the persistent vector index, the retriever bound to it, and the
/// generative answerer.
pub struct RagService {
    index: Arc<PersistentIndex>,
    retriever: Retriever,
    embedder: Arc<dyn EmbeddingProvider>,
    answerer: Arc<dyn Answerer>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RagService {
    pub fn new(
        index: Arc<PersistentIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        answerer: Arc<dyn Answerer>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        let retriever = Retriever::new(index.clone(), embedder.clone());
        Self {
            index,
            retriever,
            embedder,
            answerer,
            chunk_size,
            chunk_overlap,
        }
    }

    pub fn embedder(&self) -> Arc<dyn EmbeddingProvider> {
        self.embedder.clone()
    }

    pub fn answerer(&self) -> Arc<dyn Answerer> {
        self.answerer.clone()
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer a query from the persistent knowledge base.
    ///
    /// Empty context short-circuits to [`NO_MATERIALS_ANSWER`] without
    /// invoking the answerer. Below the HTTP boundary this never fails:
    /// every degraded path folds into the returned answer text.
    pub async fn answer_query(&self, query: &str, k: usize) -> RagAnswer {
        let retrieved = self.retriever.retrieve(query, k).await;

        let context = retrieved
            .iter()
            .map(|r| r.passage.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        if context.is_empty() {
            return RagAnswer {
                query: query.to_string(),
                answer: NO_MATERIALS_ANSWER.to_string(),
                retrieved: Vec::new(),
            };
        }

        let answer = self.answerer.answer(query, &context).await;
        RagAnswer {
            query: query.to_string(),
            answer,
            retrieved,
        }
    }

    /// Number of passages in the persistent index.
    pub async fn document_count(&self) -> usize {
        self.index.count().await
    }

    /// Re-chunk, re-embed, and re-populate the persistent index from every
    /// document under `corpus_dir`.
    ///
    /// Deliberately a full rebuild rather than an incremental add: costlier
    /// but trivially correct. The index keeps its last-known-good contents
    /// until the whole new corpus is embedded; a concurrent query sees
    /// either the old or the new corpus, never a partial one.
    pub async fn reindex_corpus(&self, corpus_dir: &Path) -> Result<usize, RagError> {
        let chunks = scan_corpus(corpus_dir, self.chunk_size, self.chunk_overlap)?;
        if chunks.is_empty() {
            // Rebuilding to empty is legal (corpus was cleared); record it.
            info!("corpus scan produced no chunks, rebuilding to empty index");
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        // Rebuild failures carry their own variant so the upload handler
        // can distinguish "remove the saved file" from a rejected upload.
        let vectors = self
            .embedder
            .embed(&texts)
            .await
            .map_err(|e| RagError::PersistentIndexingFailure(e.to_string()))?;
        let passages = permanent_passages(chunks);

        self.index
            .replace_all(passages, vectors)
            .await
            .map_err(|e| RagError::PersistentIndexingFailure(e.to_string()))?;

        let count = self.index.count().await;
        info!(
            corpus_dir = %corpus_dir.display(),
            passages = count,
            "full corpus reindex complete"
        );
        Ok(count)
    }
}

/// Stamp chunks with permanent-store metadata and stable ids.
fn permanent_passages(chunks: Vec<DocumentChunk>) -> Vec<Passage> {
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let mut metadata = chunk.metadata;
            if let Some(map) = metadata.as_object_mut() {
                map.insert("is_temporary".to_string(), json!(false));
                map.insert("doc_index".to_string(), json!(i));
            }
            Passage {
                id: format!("doc_{}_{i}", &Uuid::new_v4().simple().to_string()[..8]),
                text: chunk.text,
                metadata,
            }
        })
        .collect()
}
