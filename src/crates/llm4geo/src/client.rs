//! HTTP client for a running llm4geo server.

use crate::api::models::{DataChatRequest, FunctionListResponse, QgisChatRequest};
use crate::api::ApiErrorResponse;
use crate::export::ExportRecommendation;
use crate::protocol::InvocationResult;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Default per-request timeout.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error body.
    #[error("Server returned {status} ({code}): {message}")]
    Server {
        status: u16,
        code: String,
        message: String,
    },
}

pub struct Llm4GeoClient {
    http: Client,
    base_url: String,
}

impl Llm4GeoClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_CLIENT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /api/chat/qgis
    pub async fn qgis_chat(&self, request: &QgisChatRequest) -> Result<InvocationResult, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/chat/qgis", self.base_url))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// POST /api/chat/data
    pub async fn data_chat(&self, text_input: &str) -> Result<ExportRecommendation, ClientError> {
        let request = DataChatRequest {
            text_input: text_input.to_string(),
        };
        let response = self
            .http
            .post(format!("{}/api/chat/data", self.base_url))
            .json(&request)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// GET /api/functions
    pub async fn functions(&self) -> Result<FunctionListResponse, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/functions", self.base_url))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ApiErrorResponse>(&body) {
            Ok(error) => (error.code, error.message),
            Err(_) => ("UNKNOWN".to_string(), body),
        };
        Err(ClientError::Server {
            status: status.as_u16(),
            code,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = Llm4GeoClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_server_error_display() {
        let err = ClientError::Server {
            status: 500,
            code: "FUNCTION_RESOLUTION".to_string(),
            message: "no match".to_string(),
        };
        assert_eq!(err.to_string(), "Server returned 500 (FUNCTION_RESOLUTION): no match");
    }
}
