//! Remote LLM provider implementations.
//!
//! These providers require API keys and talk to cloud-hosted endpoints.
//!
//! # Providers
//!
//! - **OpenAI** - OpenAI chat completions and compatible gateways

pub mod openai;

pub use openai::OpenAiClient;
