// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Node configuration, read once from environment variables at startup.
///
/// A `.env` file is honored when present (loaded in `main` before this is
/// built). Every field has a default so a bare node comes up for local use.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Address the HTTP API binds to.
    pub listen_addr: String,
    /// Directory holding the persistent vector index snapshot.
    pub vector_store_path: PathBuf,
    /// Name of the persistent collection (snapshot file stem).
    pub collection_name: String,
    /// Directory where permanently uploaded source documents are kept.
    pub corpus_dir: PathBuf,
    /// Embedding backend: "hashed" for the built-in deterministic provider,
    /// or a base URL of a remote embedding service.
    pub embedding_service_url: Option<String>,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    /// Generation backend.
    pub generation_model: String,
    pub gemini_api_key: Option<String>,
    /// Request timeout applied to both embedding and generation calls.
    pub provider_timeout: Duration,
    /// Chunking defaults for the permanent corpus.
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Chunking defaults for ephemeral session documents. Smaller on
    /// purpose: session documents are queried immediately and benefit from
    /// tighter passages.
    pub session_chunk_size: usize,
    pub session_chunk_overlap: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            vector_store_path: PathBuf::from("data/vector_store"),
            collection_name: "study_docs".to_string(),
            corpus_dir: PathBuf::from("data/docs"),
            embedding_service_url: None,
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            embedding_dimension: 384,
            generation_model: "gemini-2.5-flash".to_string(),
            gemini_api_key: None,
            provider_timeout: Duration::from_secs(30),
            chunk_size: 1000,
            chunk_overlap: 200,
            session_chunk_size: 500,
            session_chunk_overlap: 100,
        }
    }
}

impl NodeConfig {
    /// Build configuration from the process environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: env_or("LISTEN_ADDR", &defaults.listen_addr),
            vector_store_path: PathBuf::from(env_or(
                "VECTOR_STORE_PATH",
                "data/vector_store",
            )),
            collection_name: env_or("COLLECTION_NAME", &defaults.collection_name),
            corpus_dir: PathBuf::from(env_or("CORPUS_DIR", "data/docs")),
            embedding_service_url: env::var("EMBEDDING_SERVICE_URL").ok(),
            embedding_model: env_or("EMBEDDING_MODEL_NAME", &defaults.embedding_model),
            embedding_dimension: env_parse("EMBEDDING_DIMENSION", defaults.embedding_dimension),
            generation_model: env_or("GENERATION_MODEL_NAME", &defaults.generation_model),
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            provider_timeout: Duration::from_secs(env_parse("PROVIDER_TIMEOUT_SECS", 30)),
            chunk_size: env_parse("CHUNK_SIZE", defaults.chunk_size),
            chunk_overlap: env_parse("CHUNK_OVERLAP", defaults.chunk_overlap),
            session_chunk_size: env_parse("SESSION_CHUNK_SIZE", defaults.session_chunk_size),
            session_chunk_overlap: env_parse(
                "SESSION_CHUNK_OVERLAP",
                defaults.session_chunk_overlap,
            ),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
