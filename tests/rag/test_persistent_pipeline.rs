// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// End-to-end tests for the persistent knowledge-base pipeline: corpus scan,
// embedding, snapshot persistence, and grounded answering.

use fabstir_rag_node::embeddings::HashedEmbedder;
use fabstir_rag_node::rag::{CannedAnswerer, RagService, NO_MATERIALS_ANSWER};
use fabstir_rag_node::vector::{PersistentIndex, VectorIndex};
use std::path::Path;
use std::sync::Arc;

fn service_at(store_dir: &Path, chunk_size: usize, chunk_overlap: usize) -> RagService {
    let index = Arc::new(PersistentIndex::open(store_dir, "study_docs").unwrap());
    let embedder = Arc::new(HashedEmbedder::new("hashed", 64).unwrap());
    let answerer = Arc::new(CannedAnswerer::new());
    RagService::new(index, embedder, answerer, chunk_size, chunk_overlap)
}

#[tokio::test]
async fn test_small_chunks_split_document_into_multiple_passages() {
    let store = tempfile::tempdir().unwrap();
    let corpus = tempfile::tempdir().unwrap();

    // Three paragraphs, each just under the chunk size so no pair packs
    // into one chunk: exactly three passages.
    let doc = format!(
        "{}\n\n{}\n\n{}",
        "alpha ".repeat(15).trim(),
        "beta ".repeat(15).trim(),
        "gamma ".repeat(15).trim()
    );
    std::fs::write(corpus.path().join("lecture.txt"), &doc).unwrap();

    let svc = service_at(store.path(), 100, 20);
    let count = svc.reindex_corpus(corpus.path()).await.unwrap();

    assert_eq!(count, 3);
    assert_eq!(svc.document_count().await, 3);
}

#[tokio::test]
async fn test_snapshot_survives_reopen_without_reembedding() {
    let store = tempfile::tempdir().unwrap();
    let corpus = tempfile::tempdir().unwrap();
    std::fs::write(
        corpus.path().join("notes.md"),
        "Ohm's law relates voltage, current, and resistance.",
    )
    .unwrap();

    {
        let svc = service_at(store.path(), 500, 100);
        assert_eq!(svc.reindex_corpus(corpus.path()).await.unwrap(), 1);
    }

    // A fresh open of the same collection reads the snapshot from disk.
    let reopened = PersistentIndex::open(store.path(), "study_docs").unwrap();
    assert_eq!(reopened.count().await, 1);

    let embedder = Arc::new(HashedEmbedder::new("hashed", 64).unwrap());
    let svc = RagService::new(
        Arc::new(reopened),
        embedder,
        Arc::new(CannedAnswerer::new()),
        500,
        100,
    );
    let result = svc.answer_query("what does Ohm's law relate?", 3).await;
    assert_ne!(result.answer, NO_MATERIALS_ANSWER);
    assert_eq!(result.retrieved.len(), 1);
}

#[tokio::test]
async fn test_empty_index_answers_apology_without_generation() {
    let store = tempfile::tempdir().unwrap();
    let svc = service_at(store.path(), 500, 100);

    let result = svc.answer_query("anything at all", 5).await;
    assert_eq!(result.answer, NO_MATERIALS_ANSWER);
    assert!(result.retrieved.is_empty());
}

#[tokio::test]
async fn test_retrieved_passages_are_ranked_and_scored() {
    let store = tempfile::tempdir().unwrap();
    let corpus = tempfile::tempdir().unwrap();
    std::fs::write(corpus.path().join("a.txt"), "photosynthesis in plants").unwrap();
    std::fs::write(corpus.path().join("b.txt"), "rust borrow checker rules").unwrap();

    let svc = service_at(store.path(), 500, 100);
    svc.reindex_corpus(corpus.path()).await.unwrap();

    let result = svc.answer_query("rust borrow checker rules", 2).await;
    assert_eq!(result.retrieved.len(), 2);
    assert_eq!(result.retrieved[0].rank, 1);
    assert_eq!(result.retrieved[1].rank, 2);
    assert!(result.retrieved[0].score >= result.retrieved[1].score);
    assert_eq!(result.retrieved[0].passage.text, "rust borrow checker rules");
}
