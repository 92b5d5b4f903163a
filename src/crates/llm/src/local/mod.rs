//! Local LLM provider implementations.
//!
//! These providers talk to servers on localhost or the local network and
//! don't require API keys.
//!
//! # Providers
//!
//! - **Ollama** - Popular local LLM runner with wide model support

pub mod ollama;

pub use ollama::OllamaClient;
