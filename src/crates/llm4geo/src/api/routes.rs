//! API route definitions

use axum::{
    routing::{get, post},
    Router,
};
use llm::ChatModel;
use std::sync::Arc;
use std::time::Duration;

use crate::api::{handlers, middleware};
use crate::catalog::FunctionCatalog;
use crate::config::ServiceConfig;
use crate::error::Result;
use crate::export::DataExportAdvisor;
use crate::extractor::StructuredExtractor;
use crate::history::HistoryPolicy;
use crate::protocol::ProtocolOrchestrator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ProtocolOrchestrator>,
    pub advisor: Arc<DataExportAdvisor>,
    pub model: Arc<dyn ChatModel>,
    pub history_limit: usize,
    pub history_policy: HistoryPolicy,
    pub request_timeout: Duration,
}

impl AppState {
    /// Wire the protocol components for `model` and `catalog` using the
    /// retry, history and timeout settings from `config`.
    pub fn new(
        model: Arc<dyn ChatModel>,
        catalog: Arc<FunctionCatalog>,
        config: &ServiceConfig,
    ) -> Result<Self> {
        let settings = config.protocol_settings();

        let mut extractor = StructuredExtractor::new(model.clone());
        if let Some(temperature) = settings.temperature {
            extractor = extractor.with_temperature(temperature);
        }
        let advisor = DataExportAdvisor::new(extractor, settings.resolver_retries)?;

        Ok(Self {
            orchestrator: Arc::new(ProtocolOrchestrator::new(model.clone(), catalog, settings)),
            advisor: Arc::new(advisor),
            model,
            history_limit: config.protocol.history_limit,
            history_policy: config.protocol.history_policy,
            request_timeout: config.server.request_timeout(),
        })
    }
}

/// Build the complete API router
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        // Health check endpoints
        .route("/health", get(handlers::health))
        .route("/api/health", get(handlers::health_detailed))
        // Protocol endpoints
        .route("/api/chat/qgis", post(handlers::qgis_chat))
        .route("/api/chat/data", post(handlers::data_chat))
        // Catalog endpoints
        .route("/api/functions", get(handlers::list_functions))
        .route("/api/functions/:name", get(handlers::get_function))
        .route("/api/project-schema", get(handlers::project_schema))
        .layer(middleware::logging_layer())
        .layer(middleware::cors_layer())
        .with_state(app_state)
}
