// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Retrieval-augmented generation: the grounding pipeline, the persistent
//! knowledge-base service, session-scoped ephemeral stores, and quiz
//! generation built on the same retrieval path.

pub mod answerer;
pub mod errors;
pub mod quiz;
pub mod retriever;
pub mod service;
pub mod session;

pub use answerer::{
    Answerer, AnswerError, CannedAnswerer, GeminiAnswerer, GenerationOptions,
    CONTEXT_INSUFFICIENT_APOLOGY, GENERATION_FAILURE_ANSWER,
};
pub use errors::RagError;
pub use quiz::{QuizGenerator, QuizQuestion};
pub use retriever::Retriever;
pub use service::{RagAnswer, RagService, CONTEXT_SEPARATOR, NO_MATERIALS_ANSWER};
pub use session::{
    SessionAnswer, SessionEntry, SessionManager, SessionStatus, DEFAULT_SESSION_KEY,
};
