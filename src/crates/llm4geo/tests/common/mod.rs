//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use llm::{ChatModel, ChatRequest, ChatResponse, LlmError, UsageMetadata};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const OSM_URI: &str = "type=xyz&url=https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Mock model that replays canned replies and records what it was asked.
pub struct MockModel {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<ChatRequest>>,
    available: bool,
}

impl MockModel {
    pub fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
            available: true,
        })
    }

    pub fn failing(error: LlmError) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from([Err(error)])),
            requests: Mutex::new(Vec::new()),
            available: false,
        })
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for MockModel {
    async fn chat(&self, request: ChatRequest) -> llm::Result<ChatResponse> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(ChatResponse::from_text(text).with_usage(UsageMetadata::new(100, 20))),
            Some(Err(e)) => Err(e),
            None => Err(LlmError::InvalidResponse("no more replies".to_string())),
        }
    }

    async fn is_available(&self) -> llm::Result<bool> {
        Ok(self.available)
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

/// A model whose calls never return.
pub struct StalledModel;

#[async_trait]
impl ChatModel for StalledModel {
    async fn chat(&self, _request: ChatRequest) -> llm::Result<ChatResponse> {
        std::future::pending::<()>().await;
        Err(LlmError::Timeout("unreachable".to_string()))
    }

    fn model_name(&self) -> &str {
        "stalled"
    }
}
