// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Deterministic hash-seeded embedding provider.
//!
//! No model weights: vectors are derived from a hash of the input text via
//! a linear congruential generator and normalized to unit length. Texts
//! that share content always map to the same vector, which is enough for
//! exact-match retrieval in tests and offline smoke runs.

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::provider::{EmbeddingError, EmbeddingProvider};

pub struct HashedEmbedder {
    model: String,
    dimension: usize,
}

impl HashedEmbedder {
    pub fn new(model: impl Into<String>, dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::ModelUnavailable(
                "embedding dimension must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            model: model.into(),
            dimension,
        })
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        let mut embedding = Vec::with_capacity(self.dimension);
        let mut current = seed;
        for i in 0..self.dimension {
            current = (current.wrapping_mul(1664525).wrapping_add(1013904223)) ^ (i as u64);
            let value = (current as f64 / u64::MAX as f64) * 2.0 - 1.0;
            embedding.push(value as f32);
        }

        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for HashedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.generate(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
