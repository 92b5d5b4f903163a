//! Request types for chat models.
//!
//! A [`ChatRequest`] bundles the conversation with generation settings and an
//! optional structured-output constraint.

use crate::messages::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request to a chat model containing messages and configuration.
///
/// # Example
///
/// ```rust,ignore
/// use llm::{ChatRequest, Message, ResponseFormat};
///
/// let request = ChatRequest::new(vec![
///     Message::system("Answer with a city"),
///     Message::human("Where is the Colosseum?"),
/// ])
/// .with_temperature(0.0)
/// .with_response_format(ResponseFormat::new("city", schema));
/// ```
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// The conversation messages to send to the model.
    pub messages: Vec<Message>,

    /// Configuration for generation behavior.
    pub config: ChatConfig,
}

impl ChatRequest {
    /// Create a new chat request with the given messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            config: ChatConfig::default(),
        }
    }

    /// Set the temperature for generation.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = Some(max_tokens);
        self
    }

    /// Constrain the output to a JSON Schema.
    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.config.response_format = Some(format);
        self
    }
}

/// Configuration parameters for chat generation.
#[derive(Debug, Clone, Default)]
pub struct ChatConfig {
    /// Sampling temperature (0.0-2.0, provider-dependent).
    pub temperature: Option<f32>,

    /// Maximum tokens to generate.
    pub max_tokens: Option<usize>,

    /// Structured-output constraint.
    pub response_format: Option<ResponseFormat>,
}

/// A named JSON Schema the model output should conform to.
///
/// Providers forward the schema as an output constraint but do not guarantee
/// conformance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    /// Schema name; OpenAI requires `^[a-zA-Z0-9_-]+$`.
    pub name: String,

    /// The JSON Schema document.
    pub schema: Value,
}

impl ResponseFormat {
    /// Create a new response format.
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: sanitize_name(&name.into()),
            schema,
        }
    }
}

fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .take(64)
        .collect();

    if cleaned.is_empty() {
        "response".to_string()
    } else {
        cleaned
    }
}
