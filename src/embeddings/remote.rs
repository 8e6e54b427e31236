// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Remote embedding provider.
//!
//! Speaks the `/v1/embed` wire format: `{texts, model}` in, camelCase
//! `{embeddings: [{embedding, text, tokenCount}], model}` out. The service
//! is probed once at construction; a node never starts with an embedding
//! backend it cannot reach.

use async_trait::async_trait;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use super::provider::{EmbeddingError, EmbeddingProvider};

/// Query embeddings are small and repeat often; chunk embeddings do not.
const EMBEDDING_CACHE_CAPACITY: usize = 512;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    model: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmbedResponse {
    embeddings: Vec<EmbeddingResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddingResult {
    embedding: Vec<f32>,
}

pub struct RemoteEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimension: usize,
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl RemoteEmbedder {
    /// Connect to an embedding service and verify it can serve this model.
    ///
    /// The probe embeds a single short text and checks the returned
    /// dimensionality. Failure here is `ModelUnavailable` and should abort
    /// node startup.
    pub async fn connect(
        base_url: &str,
        model: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::ModelUnavailable(e.to_string()))?;

        let embedder = Self {
            client,
            endpoint: format!("{}/v1/embed", base_url.trim_end_matches('/')),
            model: model.into(),
            dimension,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(EMBEDDING_CACHE_CAPACITY)
                    .expect("cache capacity is non-zero"),
            )),
        };

        let probe = embedder
            .request(&["embedding service startup probe".to_string()])
            .await
            .map_err(|e| EmbeddingError::ModelUnavailable(e.to_string()))?;
        match probe.first() {
            Some(v) if v.len() == dimension => Ok(embedder),
            Some(v) => Err(EmbeddingError::ModelUnavailable(format!(
                "service returned {}-dimensional vectors, expected {}",
                v.len(),
                dimension
            ))),
            None => Err(EmbeddingError::ModelUnavailable(
                "service returned no vectors for the startup probe".to_string(),
            )),
        }
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let body = EmbedRequest {
            texts,
            model: &self.model,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::RequestFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| EmbeddingError::RequestFailed(e.to_string()))?;

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::RequestFailed(e.to_string()))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(EmbeddingError::ResponseMisaligned {
                sent: texts.len(),
                got: parsed.embeddings.len(),
            });
        }

        let mut vectors = Vec::with_capacity(parsed.embeddings.len());
        for result in parsed.embeddings {
            if result.embedding.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    actual: result.embedding.len(),
                });
            }
            vectors.push(result.embedding);
        }

        Ok(vectors)
    }

    fn cache_key(&self, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(self.model.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Serve cached entries, batch the misses into one request.
        let keys: Vec<String> = texts.iter().map(|t| self.cache_key(t)).collect();
        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut miss_indices = Vec::new();
        {
            let mut cache = self.cache.lock().expect("embedding cache poisoned");
            for (i, key) in keys.iter().enumerate() {
                match cache.get(key) {
                    Some(vector) => results[i] = Some(vector.clone()),
                    None => miss_indices.push(i),
                }
            }
        }

        if !miss_indices.is_empty() {
            let miss_texts: Vec<String> =
                miss_indices.iter().map(|&i| texts[i].clone()).collect();
            debug!(
                misses = miss_indices.len(),
                total = texts.len(),
                "embedding cache misses"
            );
            let vectors = self.request(&miss_texts).await?;

            let mut cache = self.cache.lock().expect("embedding cache poisoned");
            for (&i, vector) in miss_indices.iter().zip(vectors.into_iter()) {
                cache.put(keys[i].clone(), vector.clone());
                results[i] = Some(vector);
            }
        }

        Ok(results
            .into_iter()
            .map(|v| v.expect("every slot filled from cache or request"))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
