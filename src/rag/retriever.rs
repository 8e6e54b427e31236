// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Query-time retrieval over a bound vector index.

use std::sync::Arc;
use tracing::warn;

use crate::embeddings::EmbeddingProvider;
use crate::vector::{ScoredPassage, VectorIndex};

/// Composes the shared embedding provider with one vector index into
/// "query text in, ranked scored passages out".
///
/// Fail-soft by contract: embedding or search failure is logged and
/// degrades to an empty result, indistinguishable from a genuinely sparse
/// corpus. Retrieval never crashes the query path.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { index, embedder }
    }

    pub async fn retrieve(&self, query: &str, k: usize) -> Vec<ScoredPassage> {
        let query_vector = match self.embedder.embed_one(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(
                    error = %e,
                    code = e.error_code(),
                    "query embedding failed, degrading to empty retrieval"
                );
                return Vec::new();
            }
        };

        match self.index.search(&query_vector, k).await {
            Ok(results) => results,
            Err(e) => {
                warn!(
                    error = %e,
                    code = e.error_code(),
                    "index search failed, degrading to empty retrieval"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbeddingError, HashedEmbedder};
    use crate::vector::{EphemeralIndex, Passage};
    use async_trait::async_trait;
    use serde_json::json;

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::RequestFailed("connection reset".to_string()))
        }

        fn dimension(&self) -> usize {
            384
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_retrieve_returns_ranked_passages() {
        let embedder = Arc::new(HashedEmbedder::new("hashed", 64).unwrap());
        let index = Arc::new(EphemeralIndex::new());

        let texts = vec!["photosynthesis basics".to_string(), "rust borrowing".to_string()];
        let vectors = embedder.embed(&texts).await.unwrap();
        let passages: Vec<Passage> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Passage {
                id: format!("doc_{i}"),
                text: t.clone(),
                metadata: json!({"source_file": "s.txt", "is_temporary": false}),
            })
            .collect();
        index.upsert(passages, vectors).await.unwrap();

        let retriever = Retriever::new(index, embedder);
        let results = retriever.retrieve("rust borrowing", 2).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].passage.text, "rust borrowing");
        assert_eq!(results[0].rank, 1);
    }

    #[tokio::test]
    async fn test_retrieve_never_raises_on_embed_failure() {
        let index = Arc::new(EphemeralIndex::new());
        let retriever = Retriever::new(index, Arc::new(FailingEmbedder));

        let results = retriever.retrieve("anything", 5).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_empty_index_is_empty_not_error() {
        let embedder = Arc::new(HashedEmbedder::new("hashed", 64).unwrap());
        let retriever = Retriever::new(Arc::new(EphemeralIndex::new()), embedder);

        let results = retriever.retrieve("anything", 5).await;
        assert!(results.is_empty());
    }
}
