// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text embedding providers.
//!
//! The node holds exactly one provider instance, shared by the persistent
//! retriever and every ephemeral session, so the expensive model
//! acquisition happens once at startup.

pub mod hashed;
pub mod provider;
pub mod remote;

pub use hashed::HashedEmbedder;
pub use provider::{EmbeddingError, EmbeddingProvider};
pub use remote::RemoteEmbedder;
