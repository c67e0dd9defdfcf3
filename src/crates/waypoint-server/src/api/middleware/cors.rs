//! CORS middleware configuration
//!
//! The confirmation dashboard is served from a separate origin during
//! development, so the API answers cross-origin requests permissively.

use tower_http::cors::CorsLayer;

/// Create the CORS layer applied to every route
pub fn cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}
