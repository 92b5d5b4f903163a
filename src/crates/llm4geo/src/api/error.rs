//! API error types and HTTP response conversion
//!
//! Protocol failures map to 5xx responses carrying the diagnostic; request
//! envelope problems are rejected with 400 before the protocol runs.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ProtocolError;

/// API error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for programmatic handling
    pub code: String,
}

impl ApiErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown catalog entry
    #[error("Not found: {0}")]
    NotFound(String),

    /// Body is not JSON at all
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Body is JSON but not a valid envelope
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// No catalog function could be selected
    #[error("{0}")]
    FunctionResolution(String),

    /// Parameters never satisfied the function schema
    #[error("{0}")]
    SchemaValidation(String),

    /// The model provider failed
    #[error("Upstream model error: {0}")]
    Upstream(String),

    /// The request deadline elapsed
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::FunctionResolution(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::SchemaValidation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code identifier
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::FunctionResolution(_) => "FUNCTION_RESOLUTION",
            ApiError::SchemaValidation(_) => "SCHEMA_VALIDATION",
            ApiError::Upstream(_) => "UPSTREAM_ERROR",
            ApiError::Timeout(_) => "TIMEOUT",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the error type name
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::ValidationError(_) => "ValidationError",
            ApiError::FunctionResolution(_) => "FunctionResolutionError",
            ApiError::SchemaValidation(_) => "SchemaValidationError",
            ApiError::Upstream(_) => "ExtractionError",
            ApiError::Timeout(_) => "Timeout",
            ApiError::InternalError(_) => "InternalError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorResponse::new(self.error_type(), self.to_string(), self.code());

        if status.is_server_error() {
            tracing::error!("API Error: {:?}", body);
        } else {
            tracing::warn!("API Error: {:?}", body);
        }

        (status, Json(body)).into_response()
    }
}

impl From<ProtocolError> for ApiError {
    fn from(err: ProtocolError) -> Self {
        if err.is_timeout() {
            return ApiError::Timeout(err.to_string());
        }
        match err {
            ProtocolError::Extraction(e) => ApiError::Upstream(e.to_string()),
            e @ ProtocolError::FunctionResolution { .. } => ApiError::FunctionResolution(e.to_string()),
            e @ ProtocolError::SchemaValidation { .. } => ApiError::SchemaValidation(e.to_string()),
            ProtocolError::NotFound(name) => ApiError::NotFound(format!("function '{}'", name)),
            e @ (ProtocolError::Cancelled | ProtocolError::Catalog(_)) => {
                ApiError::InternalError(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => ApiError::ValidationError(e.body_text()),
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}
