//! Health check endpoint handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::api::{models::HealthResponse, routes::AppState};

/// Handler for GET /health
///
/// Liveness only; never touches the model provider.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::new("ok"))
}

/// Handler for GET /api/health
///
/// Reports whether the configured model provider is reachable.
pub async fn health_detailed(
    State(app_state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let model_name = app_state.model.model_name().to_string();
    match app_state.model.is_available().await {
        Ok(true) => (
            StatusCode::OK,
            Json(HealthResponse::new("ok").with_model(model_name, true)),
        ),
        Ok(false) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse::new("degraded").with_model(model_name, false)),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Model health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::new("degraded").with_model(model_name, false)),
            )
        }
    }
}
