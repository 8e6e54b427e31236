// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vector indexes: passage records paired with fixed-dimension embeddings.
//!
//! Two lifecycles share one contract: `PersistentIndex` survives restarts
//! via an on-disk snapshot, `EphemeralIndex` lives in RAM for the duration
//! of one session.

pub mod index;
pub mod memory;
pub mod persistent;
pub mod types;

pub use index::{IndexError, VectorIndex};
pub use memory::EphemeralIndex;
pub use persistent::PersistentIndex;
pub use types::{cosine_similarity, Passage, ScoredPassage};
