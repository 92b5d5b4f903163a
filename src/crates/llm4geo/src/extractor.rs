//! Structured extraction: one schema-constrained model call.
//!
//! The extractor sends a prompt with a target schema and returns whatever
//! object comes back. It does not validate or retry; both are stage
//! concerns because the corrective prompt differs per stage. Provider
//! failures are surfaced unchanged as [`ProtocolError::Extraction`].

use crate::error::{ProtocolError, Result};
use crate::history::ChatHistory;
use llm::{ChatModel, ChatRequest, Message, ResponseFormat, UsageMetadata};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Inputs of a single extraction.
#[derive(Debug, Clone)]
pub struct ExtractionRequest<'a> {
    pub system_prompt: &'a str,
    pub history: &'a ChatHistory,
    pub user_text: &'a str,
    /// Extra turns after the user text, used for corrective follow-ups.
    pub follow_up: Vec<Message>,
    pub schema: &'a Value,
    pub schema_name: &'a str,
}

impl<'a> ExtractionRequest<'a> {
    pub fn new(
        system_prompt: &'a str,
        history: &'a ChatHistory,
        user_text: &'a str,
        schema: &'a Value,
        schema_name: &'a str,
    ) -> Self {
        Self {
            system_prompt,
            history,
            user_text,
            follow_up: Vec::new(),
            schema,
            schema_name,
        }
    }

    pub fn with_follow_up(mut self, follow_up: Vec<Message>) -> Self {
        self.follow_up = follow_up;
        self
    }

    fn to_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.history.len() + self.follow_up.len() + 2);
        messages.push(Message::system(self.system_prompt));
        messages.extend(self.history.to_messages());
        messages.push(Message::human(self.user_text));
        messages.extend(self.follow_up.iter().cloned());
        messages
    }
}

/// Candidate object returned by the model. Untrusted until validated.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Parsed JSON. Text that does not parse is kept as a JSON string so
    /// that schema validation rejects it with a readable diagnostic.
    pub value: Value,
    /// The raw model text.
    pub raw: String,
    pub usage: Option<UsageMetadata>,
}

/// Wraps a [`ChatModel`] for schema-constrained calls.
#[derive(Clone)]
pub struct StructuredExtractor {
    model: Arc<dyn ChatModel>,
    temperature: Option<f32>,
}

impl StructuredExtractor {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn model(&self) -> &Arc<dyn ChatModel> {
        &self.model
    }

    /// Make one model call.
    ///
    /// Returns [`ProtocolError::Cancelled`] as soon as `cancel` fires; an
    /// in-flight call is dropped rather than awaited.
    pub async fn extract(
        &self,
        request: ExtractionRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<Extraction> {
        if cancel.is_cancelled() {
            return Err(ProtocolError::Cancelled);
        }

        let mut chat_request = ChatRequest::new(request.to_messages()).with_response_format(
            ResponseFormat::new(request.schema_name, request.schema.clone()),
        );
        if let Some(temperature) = self.temperature {
            chat_request = chat_request.with_temperature(temperature);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProtocolError::Cancelled),
            response = self.model.chat(chat_request) => response?,
        };

        let raw = response.message.content;
        debug!(
            model = self.model.model_name(),
            schema = request.schema_name,
            response_len = raw.len(),
            "Model call completed"
        );

        Ok(Extraction {
            value: parse_object(&raw),
            raw,
            usage: response.usage,
        })
    }
}

/// Parse model text as JSON, tolerating code fences and surrounding prose.
pub fn parse_object(text: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return value;
    }

    extract_json(text)
        .and_then(|json| serde_json::from_str(json).ok())
        .unwrap_or_else(|| Value::String(text.to_string()))
}

fn extract_json(text: &str) -> Option<&str> {
    for fence in ["```json", "```JSON"] {
        if let Some(start) = text.find(fence) {
            let content = &text[start + fence.len()..];
            if let Some(end) = content.find("```") {
                return Some(content[..end].trim());
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(text[start..=end].trim())
    } else {
        None
    }
}
