//! Core trait for language-model providers.

use crate::error::Result;
use crate::request::ChatRequest;
use crate::response::ChatResponse;
use async_trait::async_trait;

/// Core trait for chat-based language models.
///
/// Implementations convert messages to their provider format, make the call
/// and convert the answer back. When the request carries a
/// [`ResponseFormat`](crate::ResponseFormat) it is forwarded as an output
/// constraint; conformance is not guaranteed.
///
/// Implementations must be `Send + Sync`; share them as `Arc<dyn ChatModel>`.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a complete chat response from messages.
    ///
    /// Transport and provider failures are returned as [`LlmError`](crate::LlmError)
    /// without retrying.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Check if the provider is reachable.
    ///
    /// Default implementation assumes availability.
    async fn is_available(&self) -> Result<bool> {
        Ok(true)
    }

    /// Identifier of the model in use, for logs and health output.
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Message;
    use std::sync::Arc;

    struct EchoModel;

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(ChatResponse::from_text(last))
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_trait_object_usage() {
        let model: Arc<dyn ChatModel> = Arc::new(EchoModel);
        let response = model
            .chat(ChatRequest::new(vec![Message::human("ping")]))
            .await
            .unwrap();

        assert_eq!(response.message.text(), "ping");
        assert!(model.is_available().await.unwrap());
        assert_eq!(model.model_name(), "echo");
    }
}
