// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! The vector index contract shared by the persistent and ephemeral stores.

use async_trait::async_trait;
use thiserror::Error;

use super::types::{Passage, ScoredPassage};

#[derive(Error, Debug)]
pub enum IndexError {
    /// Caller handed over a different number of passages and vectors.
    /// Programmer error, propagated, never retried.
    #[error("Shape mismatch: {passages} passages but {vectors} vectors")]
    ShapeMismatch { passages: usize, vectors: usize },

    /// Snapshot could not be written or read back.
    #[error("Snapshot I/O failed: {0}")]
    SnapshotIo(#[from] std::io::Error),

    /// Snapshot bytes did not decode.
    #[error("Snapshot corrupt: {0}")]
    SnapshotCorrupt(String),
}

impl IndexError {
    pub fn error_code(&self) -> &'static str {
        match self {
            IndexError::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            IndexError::SnapshotIo(_) => "SNAPSHOT_IO",
            IndexError::SnapshotCorrupt(_) => "SNAPSHOT_CORRUPT",
        }
    }
}

/// A named collection of (passage, vector) records with nearest-neighbor
/// search.
///
/// Records are insertion-ordered. `search` scores by cosine similarity,
/// breaks score ties by insertion order (stable), and returns at most `k`
/// results with 1-based ascending ranks. Searching an empty index or with
/// `k == 0` yields an empty Vec, not an error. `upsert` is all-or-nothing
/// per call: a concurrent reader sees either none or all of the batch.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(
        &self,
        passages: Vec<Passage>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), IndexError>;

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPassage>, IndexError>;

    async fn count(&self) -> usize;
}

/// Brute-force scored scan over insertion-ordered records.
///
/// Shared by both index implementations. Sorting is by score descending
/// with the insertion position as the tie-break, which keeps equal-score
/// ordering stable across runs.
pub(crate) fn scan_records(
    records: &[(Passage, Vec<f32>)],
    query: &[f32],
    k: usize,
) -> Vec<ScoredPassage> {
    if k == 0 || records.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, f32)> = records
        .iter()
        .enumerate()
        .map(|(pos, (_, vector))| (pos, super::types::cosine_similarity(query, vector)))
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored.truncate(k);

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (pos, score))| ScoredPassage {
            passage: records[pos].0.clone(),
            rank: i + 1,
            score,
        })
        .collect()
}
