// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory vector index for ephemeral session documents.
//!
//! Lives only in process RAM, scoped to one session, and dropped with the
//! last reference. Never written to disk.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::index::{scan_records, IndexError, VectorIndex};
use super::types::{Passage, ScoredPassage};

#[derive(Debug, Default)]
pub struct EphemeralIndex {
    records: RwLock<Vec<(Passage, Vec<f32>)>>,
}

impl EphemeralIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for EphemeralIndex {
    async fn upsert(
        &self,
        passages: Vec<Passage>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), IndexError> {
        if passages.len() != vectors.len() {
            return Err(IndexError::ShapeMismatch {
                passages: passages.len(),
                vectors: vectors.len(),
            });
        }

        let mut records = self.records.write().await;
        records.extend(passages.into_iter().zip(vectors));
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPassage>, IndexError> {
        let records = self.records.read().await;
        Ok(scan_records(&records, query, k))
    }

    async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}
