//! API middleware layer
//!
//! Provides middleware for request processing including CORS, request
//! logging, and validation helpers.

pub mod cors;
pub mod logging;
pub mod validation;

pub use cors::cors_layer;
pub use logging::logging_layer;
pub use validation::{validate_json_object, validate_not_empty};
