// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP handlers for the RAG node.

use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{error, info};

use super::errors::ApiError;
use super::schemas::{
    ClearTempResponse, FullQueryResponse, HealthResponse, NodeStatusResponse, QueryRequest,
    QuizRequest, QuizResponse, SimpleQueryResponse, TempStatusResponse, UploadParams,
    UploadResponse,
};
use super::server::AppState;
use crate::ingest::is_supported_extension;
use crate::rag::DEFAULT_SESSION_KEY;

/// Origin tags prefixed to `/temp_query` answers so the client can tell an
/// ephemeral-store answer from a persistent-store one.
fn temp_origin(filename: &str) -> String {
    format!("[Answer from {filename} (TEMP)]: ")
}
const MAIN_ORIGIN: &str = "[Answer from Main DB]: ";

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        embedding_model: state.embedding_model.clone(),
        generation_model: state.generation_model.clone(),
    })
}

/// Grounded query against the persistent knowledge base.
pub async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<SimpleQueryResponse>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::InvalidRequest("query cannot be empty".to_string()));
    }

    info!(query = %request.query, k = request.k(), "persistent query received");
    let result = state.rag.answer_query(&request.query, request.k()).await;

    Ok(Json(SimpleQueryResponse {
        query: result.query,
        answer: result.answer,
    }))
}

/// Same as `/query` but includes the retrieved passages.
pub async fn query_full_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<FullQueryResponse>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::InvalidRequest("query cannot be empty".to_string()));
    }

    let result = state.rag.answer_query(&request.query, request.k()).await;
    Ok(Json(FullQueryResponse {
        query: result.query,
        answer: result.answer,
        retrieved_passages: result.retrieved,
    }))
}

/// Upload a document, either appending it to the permanent corpus (with a
/// full reindex) or indexing it into an ephemeral session.
pub async fn upload_handler(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let (raw_filename, bytes) = read_file_field(&mut multipart).await?;
    let filename = base_filename(&raw_filename)?;

    if !is_supported_extension(&filename) {
        return Err(ApiError::UploadRejected {
            code: "UNSUPPORTED_FORMAT",
            message: format!("Cannot extract text from '{filename}': unsupported format"),
        });
    }

    if params.save_permanent {
        upload_permanent(&state, &filename, &bytes).await
    } else {
        let session_key = params
            .session_key
            .as_deref()
            .unwrap_or(DEFAULT_SESSION_KEY);
        upload_temporary(&state, &filename, &bytes, session_key).await
    }
}

async fn upload_permanent(
    state: &AppState,
    filename: &str,
    bytes: &[u8],
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    std::fs::create_dir_all(&state.corpus_dir)
        .map_err(|e| ApiError::InternalError(format!("corpus dir unavailable: {e}")))?;
    let saved_path = state.corpus_dir.join(filename);
    std::fs::write(&saved_path, bytes)
        .map_err(|e| ApiError::InternalError(format!("could not save upload: {e}")))?;

    match state.rag.reindex_corpus(&state.corpus_dir).await {
        Ok(count) => {
            info!(filename, passages = count, "permanent upload indexed");
            Ok((
                StatusCode::CREATED,
                Json(UploadResponse {
                    status: "Saved Permanently".to_string(),
                    filename: filename.to_string(),
                    chunks_indexed: None,
                    message: "File added to permanent vector store and indexed.".to_string(),
                }),
            ))
        }
        Err(e) => {
            // Never leave an unindexed orphan in the corpus directory; the
            // index itself kept its last-known-good contents.
            if let Err(cleanup) = std::fs::remove_file(&saved_path) {
                error!(
                    path = %saved_path.display(),
                    error = %cleanup,
                    "failed to remove orphaned upload after reindex failure"
                );
            }
            error!(filename, error = %e, "permanent indexing failed");
            Err(ApiError::from(e))
        }
    }
}

async fn upload_temporary(
    state: &AppState,
    filename: &str,
    bytes: &[u8],
    session_key: &str,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let status = state
        .sessions
        .index_session(bytes, filename, session_key)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            status: "Indexed Temporarily".to_string(),
            filename: filename.to_string(),
            chunks_indexed: Some(status.chunk_count),
            message: "Data indexed in RAM for temporary session querying.".to_string(),
        }),
    ))
}

/// Reduce a client-supplied filename to its final path component.
///
/// The multipart filename is attacker-controlled; joining it verbatim onto
/// the corpus directory would let `../x.txt` write outside it. Names with
/// no final component (`..`, `/`, empty) are rejected.
fn base_filename(raw: &str) -> Result<String, ApiError> {
    match std::path::Path::new(raw).file_name().and_then(|n| n.to_str()) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(ApiError::InvalidRequest(format!(
            "invalid upload filename: '{raw}'"
        ))),
    }
}

async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("malformed multipart body: {e}")))?
    {
        let Some(filename) = field.file_name().map(|f| f.to_string()) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("could not read upload: {e}")))?;
        return Ok((filename, bytes.to_vec()));
    }

    Err(ApiError::InvalidRequest(
        "multipart body must contain a file field".to_string(),
    ))
}

/// Query the active ephemeral session, falling back to the persistent
/// knowledge base when the session cannot answer. Always 200 below the
/// HTTP boundary; the origin tag tells the client which store answered.
pub async fn temp_query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<SimpleQueryResponse>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::InvalidRequest("query cannot be empty".to_string()));
    }

    let session_key = request
        .session_key
        .as_deref()
        .unwrap_or(DEFAULT_SESSION_KEY);
    let session_result = state
        .sessions
        .query_session(&request.query, request.k(), session_key)
        .await;

    if let (Some(answer), Some(source_file)) =
        (session_result.answer, session_result.source_file)
    {
        return Ok(Json(SimpleQueryResponse {
            query: request.query,
            answer: format!("{}{answer}", temp_origin(&source_file)),
        }));
    }

    info!(session_key, "session store empty or unresponsive, falling back to main store");
    let main_result = state.rag.answer_query(&request.query, request.k()).await;
    Ok(Json(SimpleQueryResponse {
        query: request.query,
        answer: format!("{MAIN_ORIGIN}{}", main_result.answer),
    }))
}

#[derive(Debug, serde::Deserialize)]
pub struct SessionKeyParam {
    #[serde(default)]
    pub session_key: Option<String>,
}

/// Drop the ephemeral session. Idempotent.
pub async fn clear_temp_handler(
    State(state): State<AppState>,
    Query(params): Query<SessionKeyParam>,
) -> Json<ClearTempResponse> {
    let session_key = params.session_key.as_deref().unwrap_or(DEFAULT_SESSION_KEY);
    state.sessions.delete_session(session_key).await;

    Json(ClearTempResponse {
        status: "success".to_string(),
        message: "Temporary RAG store cleared from RAM.".to_string(),
    })
}

pub async fn check_temp_status_handler(
    State(state): State<AppState>,
    Query(params): Query<SessionKeyParam>,
) -> Json<TempStatusResponse> {
    let session_key = params.session_key.as_deref().unwrap_or(DEFAULT_SESSION_KEY);
    let status = state.sessions.status(session_key).await;

    Json(TempStatusResponse {
        is_active: status.is_active,
        filename: status.filename,
        chunk_count: status.chunk_count,
        keys_in_store: state.sessions.active_keys().await,
    })
}

pub async fn status_handler(
    State(state): State<AppState>,
    Query(params): Query<SessionKeyParam>,
) -> Json<NodeStatusResponse> {
    let session_key = params.session_key.as_deref().unwrap_or(DEFAULT_SESSION_KEY);

    Json(NodeStatusResponse {
        document_count: state.rag.document_count().await,
        embedding_model: state.embedding_model.clone(),
        generation_model: state.generation_model.clone(),
        session: state.sessions.status(session_key).await,
    })
}

/// Generate MCQs for a topic from the persistent knowledge base.
pub async fn quiz_handler(
    State(state): State<AppState>,
    Json(request): Json<QuizRequest>,
) -> Result<Json<QuizResponse>, ApiError> {
    if request.topic.trim().is_empty() {
        return Err(ApiError::InvalidRequest("topic cannot be empty".to_string()));
    }

    let questions = state
        .quiz
        .generate(&request.topic, request.num_questions)
        .await;
    Ok(Json(QuizResponse {
        topic: request.topic,
        questions,
    }))
}
