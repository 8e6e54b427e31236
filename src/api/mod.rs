// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP surface of the RAG node.

pub mod errors;
pub mod handlers;
pub mod schemas;
pub mod server;

pub use errors::{ApiError, ErrorResponse};
pub use schemas::{
    ClearTempResponse, FullQueryResponse, HealthResponse, NodeStatusResponse, QueryRequest,
    QuizRequest, QuizResponse, SimpleQueryResponse, TempStatusResponse, UploadParams,
    UploadResponse,
};
pub use server::{build_router, start_server, AppState};
