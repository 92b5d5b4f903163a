//! Scripted chat model for unit tests.

use async_trait::async_trait;
use llm::{ChatModel, ChatRequest, ChatResponse, LlmError, UsageMetadata};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays canned responses in order and records every request.
pub(crate) struct ScriptedModel {
    responses: Arc<Mutex<VecDeque<Result<String, LlmError>>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    hang: bool,
}

impl ScriptedModel {
    pub(crate) fn new(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
            hang: false,
        }
    }

    /// Successful responses only.
    pub(crate) fn replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|r| Ok(r.into())).collect())
    }

    /// A model whose calls never complete.
    pub(crate) fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new(Vec::new())
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Content of the last message of each request.
    pub(crate) fn last_messages(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.messages.last().map(|m| m.content.clone()))
            .collect()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, request: ChatRequest) -> llm::Result<ChatResponse> {
        self.requests.lock().unwrap().push(request);

        if self.hang {
            std::future::pending::<()>().await;
        }

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(ChatResponse::from_text(text).with_usage(UsageMetadata::new(10, 5))),
            Some(Err(e)) => Err(e),
            None => Err(LlmError::InvalidResponse("script exhausted".to_string())),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
