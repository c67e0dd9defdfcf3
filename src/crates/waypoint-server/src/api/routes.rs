//! API route definitions
//!
//! Defines all API routes and their associated handler functions.

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::api::{handlers, middleware, ws};
use waypoint_core::{Computation, ExecutionRegistry};
use waypoint_store::{CheckpointStore, OverlayStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: ExecutionRegistry,
    pub checkpoints: CheckpointStore,
    pub overlays: OverlayStore,
    /// Computation handed to every created execution
    pub flow: Arc<dyn Computation>,
}

/// Build the complete API router
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        // Health check endpoint
        .route("/api/health", get(handlers::health))
        // Execution endpoints
        .route("/api/execute", post(handlers::execute))
        .route("/api/execute/:id/resume", post(handlers::resume))
        .route("/api/executions", get(handlers::list_executions))
        .route("/api/executions/:id", get(handlers::get_execution))
        .route("/api/state/:id", get(handlers::get_state))
        .route("/api/logs/:id", get(handlers::get_logs))
        // Confirmation endpoint
        .route("/api/confirm", post(handlers::confirm))
        // Checkpoint endpoints
        .route("/api/checkpoints", get(handlers::list_checkpoints))
        .route("/api/checkpoints/:id", delete(handlers::delete_checkpoint))
        // Live event stream
        .route("/ws/events/:id", get(ws::events))
        .layer(middleware::logging_layer())
        .layer(middleware::cors_layer())
        .with_state(app_state)
}
