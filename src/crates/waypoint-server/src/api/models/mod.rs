//! API request and response models
//!
//! DTOs exchanged over the HTTP API, organized by resource.

pub mod checkpoint;
pub mod confirmation;
pub mod execution;
pub mod health;

pub use checkpoint::CheckpointDeleted;
pub use confirmation::{ConfirmAction, ConfirmRequest};
pub use execution::{ExecuteRequest, ExecutionView, StageLogView, StateView};
pub use health::HealthResponse;
