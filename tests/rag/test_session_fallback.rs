// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Integration tests for ephemeral session stores and the session-to-main
// fallback contract.

use fabstir_rag_node::embeddings::HashedEmbedder;
use fabstir_rag_node::rag::{CannedAnswerer, RagError, SessionManager, DEFAULT_SESSION_KEY};
use std::sync::Arc;

fn manager() -> SessionManager {
    let embedder = Arc::new(HashedEmbedder::new("hashed", 64).unwrap());
    let answerer = Arc::new(CannedAnswerer::new());
    SessionManager::new(embedder, answerer, 500, 100)
}

#[tokio::test]
async fn test_absent_session_signals_fallback() {
    let sessions = manager();

    let result = sessions.query_session("anything", 5, "nobody-home").await;
    assert!(result.answer.is_none());
    assert!(result.source_file.is_none());
}

#[tokio::test]
async fn test_indexed_session_answers_with_source_file() {
    let sessions = manager();
    sessions
        .index_session(
            b"Mitochondria are the powerhouse of the cell.",
            "bio.txt",
            DEFAULT_SESSION_KEY,
        )
        .await
        .unwrap();

    let result = sessions
        .query_session("what are mitochondria?", 5, DEFAULT_SESSION_KEY)
        .await;
    assert!(result.answer.is_some());
    assert_eq!(result.source_file.as_deref(), Some("bio.txt"));
}

#[tokio::test]
async fn test_status_reports_chunk_count_and_filename() {
    let sessions = manager();

    // Seven paragraphs with a chunk size small enough that each becomes
    // its own passage.
    let paragraphs: Vec<String> = (0..7)
        .map(|i| format!("topic {i} ").repeat(60).trim().to_string())
        .collect();
    let doc = paragraphs.join("\n\n");

    let embedder = Arc::new(HashedEmbedder::new("hashed", 64).unwrap());
    let small_chunks = SessionManager::new(embedder, Arc::new(CannedAnswerer::new()), 500, 50);
    let status = small_chunks
        .index_session(doc.as_bytes(), "seven.md", "study-session")
        .await
        .unwrap();

    assert!(status.is_active);
    assert_eq!(status.filename.as_deref(), Some("seven.md"));
    assert_eq!(status.chunk_count, 7);

    let polled = small_chunks.status("study-session").await;
    assert_eq!(polled, status);
}

#[tokio::test]
async fn test_reupload_replaces_session_store() {
    let sessions = manager();
    sessions
        .index_session(b"first document body", "first.txt", DEFAULT_SESSION_KEY)
        .await
        .unwrap();
    sessions
        .index_session(b"second document body", "second.txt", DEFAULT_SESSION_KEY)
        .await
        .unwrap();

    let status = sessions.status(DEFAULT_SESSION_KEY).await;
    assert_eq!(status.filename.as_deref(), Some("second.txt"));

    let result = sessions
        .query_session("what is in the document?", 5, DEFAULT_SESSION_KEY)
        .await;
    assert_eq!(result.source_file.as_deref(), Some("second.txt"));
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let sessions = manager();
    sessions
        .index_session(b"some content here", "doc.txt", "s1")
        .await
        .unwrap();

    sessions.delete_session("s1").await;
    assert!(!sessions.status("s1").await.is_active);

    // Deleting again must not fail or change the outcome.
    sessions.delete_session("s1").await;
    assert!(!sessions.status("s1").await.is_active);

    let result = sessions.query_session("anything", 5, "s1").await;
    assert!(result.answer.is_none() && result.source_file.is_none());
}

#[tokio::test]
async fn test_blank_document_is_rejected_and_creates_no_session() {
    let sessions = manager();

    let err = sessions
        .index_session(b"   \n\n  ", "blank.txt", "s1")
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::EmptyDocument { .. }));
    assert!(!sessions.status("s1").await.is_active);
}

#[tokio::test]
async fn test_sessions_are_isolated_by_key() {
    let sessions = manager();
    sessions
        .index_session(b"alice studies chemistry", "alice.txt", "alice")
        .await
        .unwrap();
    sessions
        .index_session(b"bob studies physics", "bob.txt", "bob")
        .await
        .unwrap();

    let alice = sessions.query_session("chemistry", 5, "alice").await;
    assert_eq!(alice.source_file.as_deref(), Some("alice.txt"));

    sessions.delete_session("alice").await;
    assert!(sessions.status("bob").await.is_active);
    assert_eq!(sessions.active_keys().await, vec!["bob".to_string()]);
}
