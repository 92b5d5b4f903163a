//! Service configuration for llm4geo-server
//!
//! Loads `llm4geo.toml` with server, model, protocol and catalog settings.
//! Every field has a default so the server can start without a file.

pub mod loader;

use crate::catalog::FunctionCatalog;
use crate::history::{HistoryPolicy, DEFAULT_HISTORY_LIMIT};
use crate::protocol::ProtocolSettings;
use crate::retry::RetryPolicy;
use llm::local::OllamaClient;
use llm::remote::OpenAiClient;
use llm::{ChatModel, LlmError, LocalLlmConfig, RemoteLlmConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "LLM4GEO_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to load YAML: {0}")]
    YamlError(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid catalog: {0}")]
    Catalog(String),
    #[error("Model provider setup failed: {0}")]
    Provider(#[from] LlmError),
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Deadline for one chat request, after which the protocol is cancelled.
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            request_timeout_secs: 60,
        }
    }
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Supported model backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI or a compatible chat completions endpoint
    #[serde(rename = "openai")]
    OpenAi,
    /// Local Ollama server
    Ollama,
}

/// Model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key (remote providers only).
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: Option<f32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
            temperature: Some(0.0),
        }
    }
}

/// Retry bounds and history handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub selector_max_retries: u32,
    pub resolver_max_retries: u32,
    pub history_limit: usize,
    pub history_policy: HistoryPolicy,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            selector_max_retries: 2,
            resolver_max_retries: 2,
            history_limit: DEFAULT_HISTORY_LIMIT,
            history_policy: HistoryPolicy::KeepRecent,
        }
    }
}

/// Catalog source. Without a path the built-in QGIS catalog is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub path: Option<PathBuf>,
}

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub protocol: ProtocolConfig,
    pub catalog: CatalogSettings,
}

impl ServiceConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Load configuration from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Locate and load the configuration file.
    ///
    /// Searches for config in:
    /// 1. LLM4GEO_CONFIG environment variable
    /// 2. ./config/llm4geo.toml
    /// 3. ../config/llm4geo.toml (for development)
    /// 4. ./llm4geo.toml
    ///
    /// Returns `Ok(None)` when no file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
            return Self::from_file(config_path).map(Some);
        }

        let paths = [
            PathBuf::from("config/llm4geo.toml"),
            PathBuf::from("../config/llm4geo.toml"),
            PathBuf::from("./llm4geo.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!(path = %path.display(), "Loading configuration");
                return Self::from_file(path).map(Some);
            }
        }

        Ok(None)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "server.request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "llm.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::InvalidConfig("llm.model cannot be empty".to_string()));
        }
        if self.protocol.history_limit == 0 {
            return Err(ConfigError::InvalidConfig(
                "protocol.history_limit must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Listen address as `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn protocol_settings(&self) -> ProtocolSettings {
        ProtocolSettings {
            selector_retries: RetryPolicy::new(self.protocol.selector_max_retries),
            resolver_retries: RetryPolicy::new(self.protocol.resolver_max_retries),
            temperature: self.llm.temperature,
        }
    }

    /// Construct the configured model client.
    pub fn build_model(&self) -> Result<Arc<dyn ChatModel>, ConfigError> {
        let timeout = Duration::from_secs(self.llm.timeout_secs);
        let model: Arc<dyn ChatModel> = match self.llm.provider {
            LlmProvider::OpenAi => {
                let config = RemoteLlmConfig::from_env(
                    &self.llm.api_key_env,
                    self.llm.base_url.clone(),
                    self.llm.model.clone(),
                )?
                .with_timeout(timeout);
                Arc::new(OpenAiClient::new(config)?)
            }
            LlmProvider::Ollama => {
                let config = LocalLlmConfig::new(self.llm.base_url.clone(), self.llm.model.clone())
                    .with_timeout(timeout);
                Arc::new(OllamaClient::new(config)?)
            }
        };
        Ok(model)
    }

    /// Load the configured catalog, or the built-in one.
    pub fn load_catalog(&self) -> Result<FunctionCatalog, ConfigError> {
        match &self.catalog.path {
            Some(path) => loader::load_catalog(path),
            None => FunctionCatalog::builtin().map_err(|e| ConfigError::Catalog(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:8000");
        assert_eq!(config.server.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.llm.provider, LlmProvider::OpenAi);
        assert_eq!(config.protocol.history_limit, 8);
        assert_eq!(config.protocol.history_policy, HistoryPolicy::KeepRecent);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ServiceConfig::from_str(
            r#"
[server]
port = 9000

[llm]
provider = "ollama"
base_url = "http://localhost:11434"
model = "llama3.1"

[protocol]
history_policy = "keep-oldest"
selector_max_retries = 1
"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.llm.provider, LlmProvider::Ollama);
        assert_eq!(config.protocol.history_policy, HistoryPolicy::KeepOldest);
        assert_eq!(config.protocol.resolver_max_retries, 2);

        let settings = config.protocol_settings();
        assert_eq!(settings.selector_retries.total_attempts(), 2);
        assert_eq!(settings.temperature, Some(0.0));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = ServiceConfig::from_str("[server]\nrequest_timeout_secs = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));

        let result = ServiceConfig::from_str("[protocol]\nhistory_policy = \"newest\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));

        let result = ServiceConfig::from_str("[llm]\nprovider = \"claude\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nhost = \"0.0.0.0\"\nport = 8123").unwrap();

        let config = ServiceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8123");
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = ServiceConfig::from_file("/nonexistent/llm4geo.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/llm4geo.toml"));
    }

    #[test]
    fn test_ollama_model_builds_without_key() {
        let mut config = ServiceConfig::default();
        config.llm.provider = LlmProvider::Ollama;
        config.llm.model = "llama3.1".to_string();
        let model = config.build_model().unwrap();
        assert_eq!(model.model_name(), "llama3.1");
    }

    #[test]
    fn test_openai_model_requires_key() {
        let mut config = ServiceConfig::default();
        config.llm.api_key_env = "LLM4GEO_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        assert!(matches!(
            config.build_model(),
            Err(ConfigError::Provider(LlmError::ApiKeyNotFound(_)))
        ));
    }

    #[test]
    fn test_builtin_catalog_by_default() {
        let catalog = ServiceConfig::default().load_catalog().unwrap();
        assert!(catalog.contains("go_to_location"));
    }
}
