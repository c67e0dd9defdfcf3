//! Waypoint server
//!
//! HTTP and WebSocket control plane over [`waypoint_core`]: exposes the
//! execution registry, the confirmation workflow and the checkpoint store
//! as a REST API, and ships the reference travel-booking flow it serves.

pub mod api;
pub mod config;
pub mod flow;

pub use api::{create_router, ApiError, ApiResult, AppState};
pub use config::ServerConfig;
pub use flow::TravelBookingFlow;
