// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Passage records and scored search results.

use serde::{Deserialize, Serialize};

/// One indexed chunk of source text.
///
/// Immutable once written: an index never edits a stored passage, updates
/// are delete+reinsert. `metadata` always carries `source_file` and
/// `is_temporary`; permanent-store passages additionally carry a sequential
/// `doc_index`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passage {
    /// Unique within the owning index.
    pub id: String,
    /// Literal chunk content, non-empty.
    pub text: String,
    pub metadata: serde_json::Value,
}

/// A passage returned from a similarity search.
///
/// `score` is cosine similarity, i.e. `1 - cosine_distance` for the cosine
/// metric every index in this node uses. `rank` is 1-based and ascends as
/// the score descends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub rank: usize,
    pub score: f32,
}

/// Cosine similarity between two vectors, 0.0 when either has zero
/// magnitude or the dimensions disagree.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}
