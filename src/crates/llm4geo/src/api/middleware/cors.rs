//! CORS middleware configuration
//!
//! The QGIS plugin and browser front-ends call the service from arbitrary
//! origins, so every origin is allowed.

use tower_http::cors::CorsLayer;

pub fn cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}
