//! Request envelope validation helpers.

use serde_json::Value;

use crate::api::error::{ApiError, ApiResult};

/// Reject empty or whitespace-only text fields.
pub fn validate_not_blank(value: &str, field_name: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::ValidationError(format!("{} cannot be empty", field_name)));
    }
    Ok(())
}

/// Accept a JSON object, or null for an omitted field.
pub fn validate_json_object(value: &Value, field_name: &str) -> ApiResult<()> {
    match value {
        Value::Object(_) | Value::Null => Ok(()),
        _ => Err(ApiError::ValidationError(format!("{} must be a JSON object", field_name))),
    }
}
