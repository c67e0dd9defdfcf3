//! Event envelope broadcast to execution subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::execution::{ExecutionRecord, ExecutionStatus};

/// Kind discriminator for broadcast events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ExecutionStarted,
    StateUpdate,
    ExecutionCompleted,
    Error,
}

impl EventKind {
    /// Wire name of the event kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ExecutionStarted => "execution_started",
            EventKind::StateUpdate => "state_update",
            EventKind::ExecutionCompleted => "execution_completed",
            EventKind::Error => "error",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fire-and-forget notification about one execution.
///
/// Events carry no delivery guarantee; subscribers that join after an event
/// was published never see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub execution_id: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    fn new(kind: EventKind, execution_id: &str, payload: Value) -> Self {
        Self {
            kind,
            execution_id: execution_id.to_string(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Emitted once when an execution is created.
    pub fn execution_started(record: &ExecutionRecord) -> Self {
        Self::new(
            EventKind::ExecutionStarted,
            &record.id,
            json!({
                "id": record.id,
                "status": record.status,
                "checkpoint_key": record.checkpoint_key,
            }),
        )
    }

    /// Emitted on every status or stage change.
    pub fn state_update(
        execution_id: &str,
        status: ExecutionStatus,
        current_stage: Option<&str>,
    ) -> Self {
        Self::new(
            EventKind::StateUpdate,
            execution_id,
            json!({
                "status": status,
                "current_stage": current_stage,
            }),
        )
    }

    /// Emitted when an execution reaches `completed`.
    pub fn execution_completed(execution_id: &str, result: &str) -> Self {
        Self::new(
            EventKind::ExecutionCompleted,
            execution_id,
            json!({ "result": result }),
        )
    }

    /// Emitted when an execution reaches `error`.
    pub fn error(execution_id: &str, detail: &str) -> Self {
        Self::new(EventKind::Error, execution_id, json!({ "error": detail }))
    }

    /// Serialize for the wire.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
