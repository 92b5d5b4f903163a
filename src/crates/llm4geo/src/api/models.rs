//! Request and response bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::error::ApiResult;
use crate::api::middleware::validation::{validate_json_object, validate_not_blank};
use crate::catalog::FunctionSpec;

/// Envelope for `POST /api/chat/qgis`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QgisChatRequest {
    /// What the user typed
    pub text_input: String,

    /// Current project state, passed to the model untouched
    #[serde(default)]
    pub project_description: Value,

    /// Earlier turns, alternating user and assistant, oldest first
    #[serde(default)]
    pub chat_history: Vec<String>,
}

impl QgisChatRequest {
    pub fn new(text_input: impl Into<String>) -> Self {
        Self {
            text_input: text_input.into(),
            project_description: Value::Null,
            chat_history: Vec::new(),
        }
    }

    pub fn validate(&self) -> ApiResult<()> {
        validate_not_blank(&self.text_input, "text_input")?;
        validate_json_object(&self.project_description, "project_description")
    }
}

/// Envelope for `POST /api/chat/data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataChatRequest {
    pub text_input: String,
}

impl DataChatRequest {
    pub fn validate(&self) -> ApiResult<()> {
        validate_not_blank(&self.text_input, "text_input")
    }
}

/// Catalog listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionListResponse {
    pub count: usize,
    pub functions: Vec<FunctionSpec>,
}

/// Service health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok" or "degraded"
    pub status: String,

    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_available: Option<bool>,
}

impl HealthResponse {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            model: None,
            model_available: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>, available: bool) -> Self {
        self.model = Some(model.into());
        self.model_available = Some(available);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_defaults() {
        let request: QgisChatRequest =
            serde_json::from_value(json!({"text_input": "add osm"})).unwrap();
        assert!(request.project_description.is_null());
        assert!(request.chat_history.is_empty());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_envelope_validation() {
        let mut request = QgisChatRequest::new("   ");
        assert!(request.validate().is_err());

        request.text_input = "make residential red".to_string();
        request.project_description = json!("not an object");
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_health_response_omits_model_for_liveness() {
        let body = serde_json::to_value(HealthResponse::new("ok")).unwrap();
        assert_eq!(body["status"], "ok");
        assert!(body.get("model").is_none());

        let body = serde_json::to_value(HealthResponse::new("ok").with_model("gpt-4o-mini", true)).unwrap();
        assert_eq!(body["model_available"], true);
    }
}
