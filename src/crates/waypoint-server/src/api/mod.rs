//! REST API layer for the waypoint server
//!
//! Provides HTTP endpoints for execution control:
//! - Starting and resuming executions
//! - State and stage-log inspection
//! - Confirming or amending pending tool calls
//! - Checkpoint management
//! - WebSocket real-time event streaming

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod ws;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use middleware::cors_layer;
pub use routes::{create_router, AppState};
