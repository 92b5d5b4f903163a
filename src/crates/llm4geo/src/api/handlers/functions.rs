//! Catalog endpoint handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::api::{error::ApiResult, models::FunctionListResponse, routes::AppState};
use crate::catalog::FunctionSpec;
use crate::project::project_description_schema;

/// GET /api/functions
pub async fn list_functions(State(app_state): State<AppState>) -> Json<FunctionListResponse> {
    let functions = app_state.orchestrator.catalog().list().to_vec();
    Json(FunctionListResponse {
        count: functions.len(),
        functions,
    })
}

/// GET /api/functions/:name
pub async fn get_function(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<FunctionSpec>> {
    let spec = app_state.orchestrator.catalog().get(&name)?;
    Ok(Json(spec.clone()))
}

/// Shape of the `project_description` clients are expected to send
///
/// GET /api/project-schema
pub async fn project_schema() -> Json<Value> {
    Json(project_description_schema())
}
