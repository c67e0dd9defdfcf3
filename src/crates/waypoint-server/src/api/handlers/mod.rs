//! API request handlers
//!
//! Provides handler functions for all API endpoints organized by resource.

pub mod checkpoints;
pub mod confirmations;
pub mod executions;
pub mod health;

pub use checkpoints::{delete_checkpoint, list_checkpoints};
pub use confirmations::confirm;
pub use executions::{execute, get_execution, get_logs, get_state, list_executions, resume};
pub use health::health;
