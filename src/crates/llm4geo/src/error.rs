//! Error types for the extraction protocol.

use llm::LlmError;
use serde_json::Value;
use thiserror::Error;

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can terminate a protocol request.
///
/// Invalid model output is recovered locally by bounded retry; only the
/// variants below ever reach the caller.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The model call itself failed. Never retried.
    #[error("Extraction failed: {0}")]
    Extraction(#[from] LlmError),

    /// Stage one never produced a function name from the catalog.
    #[error(
        "Function resolution failed: model answered '{function_name}' after {attempts} attempts (valid: {})",
        .valid.join(", ")
    )]
    FunctionResolution {
        function_name: String,
        attempts: u32,
        valid: Vec<String>,
    },

    /// Stage two never produced parameters that satisfy the schema.
    #[error("Schema validation failed for '{function_name}' after {attempts} attempts: {diagnostic}")]
    SchemaValidation {
        function_name: String,
        attempts: u32,
        diagnostic: String,
        last_response: Value,
    },

    /// Catalog lookup of a name that is not registered.
    #[error("Function not found: {0}")]
    NotFound(String),

    /// The caller gave up on the request.
    #[error("Request cancelled")]
    Cancelled,

    /// The catalog definition itself is unusable.
    #[error("Invalid catalog: {0}")]
    Catalog(String),
}

impl ProtocolError {
    /// Whether the request ran out of time, either by cancellation or a
    /// provider-side deadline.
    pub fn is_timeout(&self) -> bool {
        match self {
            ProtocolError::Cancelled => true,
            ProtocolError::Extraction(e) => e.is_timeout(),
            _ => false,
        }
    }
}
