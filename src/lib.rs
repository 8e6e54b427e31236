// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod embeddings;
pub mod ingest;
pub mod rag;
pub mod vector;

// Re-export the types most callers need
pub use config::NodeConfig;
pub use embeddings::{EmbeddingError, EmbeddingProvider, HashedEmbedder, RemoteEmbedder};
pub use ingest::IngestError;
pub use rag::{
    Answerer, CannedAnswerer, GeminiAnswerer, QuizGenerator, RagError, RagService,
    SessionManager,
};
pub use vector::{EphemeralIndex, IndexError, Passage, PersistentIndex, ScoredPassage, VectorIndex};
