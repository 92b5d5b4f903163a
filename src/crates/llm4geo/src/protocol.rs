//! Protocol orchestration: select, branch, resolve, assemble.
//!
//! ```text
//! SelectFunction ──invalid after retries──▶ FunctionResolution (terminal)
//!       │
//!       ▼
//!    Branch ──no parameter schema──▶ Assemble { parameters: {} }
//!       │
//!       ▼
//! ResolveParameters ──invalid after retries──▶ SchemaValidation (terminal)
//!       │
//!       ▼
//!   Assemble
//! ```
//!
//! No state survives a request; callers thread chat history back in.

use crate::catalog::FunctionCatalog;
use crate::error::{ProtocolError, Result};
use crate::extractor::StructuredExtractor;
use crate::history::ChatHistory;
use crate::project::ProjectDescription;
use crate::resolver::{ParameterResolver, ParameterSet};
use crate::retry::RetryPolicy;
use crate::selector::FunctionSelector;
use llm::ChatModel;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Final output of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    pub chat: String,
    pub function_name: String,
    #[serde(default)]
    pub parameters: ParameterSet,
}

/// Tunables for a [`ProtocolOrchestrator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtocolSettings {
    pub selector_retries: RetryPolicy,
    pub resolver_retries: RetryPolicy,
    pub temperature: Option<f32>,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            selector_retries: RetryPolicy::default(),
            resolver_retries: RetryPolicy::default(),
            temperature: Some(0.0),
        }
    }
}

/// Runs the two-stage protocol for one user turn.
///
/// Shared read-only between concurrent requests.
#[derive(Clone)]
pub struct ProtocolOrchestrator {
    catalog: Arc<FunctionCatalog>,
    selector: FunctionSelector,
    resolver: ParameterResolver,
}

impl ProtocolOrchestrator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        catalog: Arc<FunctionCatalog>,
        settings: ProtocolSettings,
    ) -> Self {
        let mut extractor = StructuredExtractor::new(model);
        if let Some(temperature) = settings.temperature {
            extractor = extractor.with_temperature(temperature);
        }

        Self {
            selector: FunctionSelector::new(
                catalog.clone(),
                extractor.clone(),
                settings.selector_retries,
            ),
            resolver: ParameterResolver::new(catalog.clone(), extractor, settings.resolver_retries),
            catalog,
        }
    }

    pub fn catalog(&self) -> &Arc<FunctionCatalog> {
        &self.catalog
    }

    /// Turn `user_text` into a validated function call.
    pub async fn handle(
        &self,
        user_text: &str,
        project: &ProjectDescription,
        history: &ChatHistory,
        cancel: &CancellationToken,
    ) -> Result<InvocationResult> {
        let selection = self.selector.select(user_text, history, cancel).await?;

        // Fail fast: never resolve parameters for a name the catalog can't
        // back.
        let spec = match self.catalog.get(&selection.function_name) {
            Ok(spec) => spec,
            Err(_) => {
                error!(function = %selection.function_name, "Selected function is not in the catalog");
                return Err(ProtocolError::FunctionResolution {
                    function_name: selection.function_name,
                    attempts: self.selector.policy().total_attempts(),
                    valid: self.catalog.names(),
                });
            }
        };

        let parameters = if spec.takes_parameters() {
            self.resolver
                .resolve(&spec.name, user_text, project, history, cancel)
                .await?
        } else {
            debug!(function = %spec.name, "Function takes no parameters, skipping resolution");
            ParameterSet::new()
        };

        info!(function = %spec.name, parameter_count = parameters.len(), "Function call resolved");

        Ok(InvocationResult {
            chat: selection.chat,
            function_name: selection.function_name,
            parameters,
        })
    }
}
