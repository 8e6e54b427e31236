// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! API error responses.
//!
//! Only malformed requests, rejected uploads, and pre-initialization
//! states produce HTTP error statuses. Query-path failures below the HTTP
//! boundary are folded into 200-status answer text by the core.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::rag::RagError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    InvalidRequest(String),
    UploadRejected { code: &'static str, message: String },
    ServiceUnavailable(String),
    InternalError(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UploadRejected { .. } => StatusCode::BAD_REQUEST,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        match self {
            ApiError::InvalidRequest(message) => ErrorResponse {
                error_type: "invalid_request".to_string(),
                message: message.clone(),
                error_code: None,
            },
            ApiError::UploadRejected { code, message } => ErrorResponse {
                error_type: "upload_rejected".to_string(),
                message: message.clone(),
                error_code: Some((*code).to_string()),
            },
            ApiError::ServiceUnavailable(message) => ErrorResponse {
                error_type: "service_unavailable".to_string(),
                message: message.clone(),
                error_code: None,
            },
            ApiError::InternalError(message) => ErrorResponse {
                error_type: "internal_error".to_string(),
                message: message.clone(),
                error_code: None,
            },
        }
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match &err {
            RagError::EmptyDocument { .. } | RagError::Ingest(_) => ApiError::UploadRejected {
                code: err.error_code(),
                message: err.user_message(),
            },
            RagError::ProviderUnavailable(_) => {
                ApiError::ServiceUnavailable(err.user_message())
            }
            _ => ApiError::InternalError(err.user_message()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}
