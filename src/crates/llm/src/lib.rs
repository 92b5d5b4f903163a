//! Language-model providers for llm4geo.
//!
//! This crate defines the provider-agnostic [`ChatModel`] trait together with
//! the message, request and response types it exchanges, and ships concrete
//! clients for a remote and a local provider.
//!
//! Every request may carry a [`ResponseFormat`]: a named JSON Schema the
//! provider is asked to constrain its output to. Providers treat the
//! constraint as a hint, so callers must still validate what comes back.
//!
//! # Remote Providers
//!
//! - **OpenAI** (and OpenAI-compatible endpoints) - `response_format: json_schema`
//!
//! # Local Providers
//!
//! - **Ollama** - schema passed through the `format` field
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::remote::OpenAiClient;
//! use llm::{ChatModel, ChatRequest, Message, RemoteLlmConfig, ResponseFormat};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RemoteLlmConfig::from_env(
//!         "OPENAI_API_KEY",
//!         "https://api.openai.com/v1",
//!         "gpt-4o-mini",
//!     )?;
//!     let client = OpenAiClient::new(config)?;
//!
//!     let schema = json!({
//!         "type": "object",
//!         "properties": {"city": {"type": "string"}},
//!         "required": ["city"]
//!     });
//!     let request = ChatRequest::new(vec![Message::human("Where is the Eiffel tower?")])
//!         .with_response_format(ResponseFormat::new("location", schema));
//!
//!     let response = client.chat(request).await?;
//!     println!("{}", response.message.text());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod messages;
pub mod request;
pub mod response;
pub mod traits;

#[cfg(feature = "local")]
pub mod local;

#[cfg(feature = "remote")]
pub mod remote;

pub use config::{LocalLlmConfig, RemoteLlmConfig};
pub use error::{LlmError, Result};
pub use messages::{Message, MessageRole};
pub use request::{ChatConfig, ChatRequest, ResponseFormat};
pub use response::{ChatResponse, UsageMetadata};
pub use traits::ChatModel;
