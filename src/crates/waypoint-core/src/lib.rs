//! Core coordination for waypoint: the execution registry, the driver
//! loop, and the event hub.
//!
//! [`ExecutionRegistry`] tracks every in-flight and historical execution
//! and drives each one on a dedicated task; [`Computation`] is the contract
//! those tasks call into; [`EventHub`] fans lifecycle events out to
//! per-execution subscribers. Durable state lives in `waypoint-store`;
//! the registry only records the outcomes computations report.

pub mod computation;
pub mod error;
pub mod events;
pub mod execution;
pub mod hub;
pub mod registry;

pub use computation::{Computation, Outcome, RunContext, StageReporter};
pub use error::{CoreError, Result};
pub use events::{Event, EventKind};
pub use execution::{ExecutionRecord, ExecutionStatus, StageLogEntry};
pub use hub::{EventHub, Subscription, DEFAULT_QUEUE_CAPACITY};
pub use registry::ExecutionRegistry;
