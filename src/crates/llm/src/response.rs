//! Response types returned by chat models.

use crate::messages::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A complete response from a chat model.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// The assistant message.
    pub message: Message,

    /// Token usage, when the provider reports it.
    pub usage: Option<UsageMetadata>,

    /// Provider-specific metadata (model name, finish reason, ...).
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ChatResponse {
    /// Create a response holding only an assistant message.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            message: Message::assistant(text),
            usage: None,
            metadata: HashMap::new(),
        }
    }

    /// Attach usage statistics.
    pub fn with_usage(mut self, usage: UsageMetadata) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Token accounting for a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    /// Prompt tokens.
    pub input_tokens: usize,

    /// Completion tokens.
    pub output_tokens: usize,

    /// Sum of both.
    pub total_tokens: usize,
}

impl UsageMetadata {
    /// Create usage metadata, deriving the total.
    pub fn new(input_tokens: usize, output_tokens: usize) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}
