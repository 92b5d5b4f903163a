//! HTTP transport for the protocol
//!
//! Endpoints:
//! - `POST /api/chat/qgis` - natural language to a QGIS function call
//! - `POST /api/chat/data` - data source and export format advice
//! - `GET /api/functions`, `GET /api/functions/:name` - the catalog
//! - `GET /api/project-schema` - expected `project_description` shape
//! - `GET /health`, `GET /api/health` - liveness and model availability

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use middleware::cors_layer;
pub use routes::{create_router, AppState};
