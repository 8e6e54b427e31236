// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use fabstir_rag_node::{
    api::{start_server, AppState},
    config::NodeConfig,
    embeddings::{EmbeddingProvider, HashedEmbedder, RemoteEmbedder},
    rag::{
        Answerer, CannedAnswerer, GeminiAnswerer, QuizGenerator, RagError, RagService,
        SessionManager,
    },
    vector::{PersistentIndex, VectorIndex},
};
use std::{env, sync::Arc};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = NodeConfig::from_env();
    info!(
        listen_addr = %config.listen_addr,
        collection = %config.collection_name,
        "starting RAG node"
    );

    let embedder = build_embedder(&config).await?;
    let answerer = build_answerer(&config)?;

    let index = Arc::new(
        PersistentIndex::open(&config.vector_store_path, &config.collection_name)
            .context("could not open persistent vector store")?,
    );
    let document_count = index.count().await;
    if document_count == 0 {
        warn!(
            "persistent vector store is empty; upload documents with save_permanent=true \
             or place them under the corpus directory and reindex"
        );
    } else {
        info!(document_count, "persistent vector store loaded");
    }

    let rag = Arc::new(RagService::new(
        index,
        embedder.clone(),
        answerer.clone(),
        config.chunk_size,
        config.chunk_overlap,
    ));
    let sessions = Arc::new(SessionManager::new(
        embedder.clone(),
        answerer.clone(),
        config.session_chunk_size,
        config.session_chunk_overlap,
    ));
    let quiz = Arc::new(QuizGenerator::new(rag.retriever().clone(), answerer.clone()));

    let state = AppState {
        rag,
        sessions,
        quiz,
        corpus_dir: config.corpus_dir.clone(),
        embedding_model: embedder.model_name().to_string(),
        generation_model: answerer.model_name().to_string(),
    };

    start_server(state, &config.listen_addr)
        .await
        .map_err(|e| anyhow::anyhow!("server error: {e}"))?;

    info!("RAG node stopped");
    Ok(())
}

async fn build_embedder(config: &NodeConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match &config.embedding_service_url {
        Some(url) => {
            info!(url = %url, model = %config.embedding_model, "using remote embedding service");
            let embedder = RemoteEmbedder::connect(
                url,
                config.embedding_model.clone(),
                config.embedding_dimension,
                config.provider_timeout,
            )
            .await
            .map_err(|e| RagError::ProviderUnavailable(e.to_string()))
            .context("embedding service unreachable")?;
            Ok(Arc::new(embedder))
        }
        None => {
            warn!("EMBEDDING_SERVICE_URL not set, using the built-in hashed embedder");
            let embedder = HashedEmbedder::new(
                config.embedding_model.clone(),
                config.embedding_dimension,
            )
            .map_err(|e| RagError::ProviderUnavailable(e.to_string()))
            .context("invalid embedding configuration")?;
            Ok(Arc::new(embedder))
        }
    }
}

fn build_answerer(config: &NodeConfig) -> Result<Arc<dyn Answerer>> {
    match &config.gemini_api_key {
        Some(key) => {
            let answerer = GeminiAnswerer::new(
                config.generation_model.clone(),
                key.clone(),
                config.provider_timeout,
            )
            .map_err(|e| RagError::ProviderUnavailable(e.to_string()))
            .context("invalid generation configuration")?;
            Ok(Arc::new(answerer))
        }
        None => {
            warn!("GEMINI_API_KEY not set, using the canned answerer (testing only)");
            Ok(Arc::new(CannedAnswerer::new()))
        }
    }
}
