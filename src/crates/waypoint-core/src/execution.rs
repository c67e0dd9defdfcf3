//! Execution lifecycle records and the status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use waypoint_store::{patch_last_pending_call, pending_tool_calls, PendingToolCall};

use crate::error::{CoreError, Result};

/// Lifecycle status of an execution.
///
/// Transitions are `running -> interrupted | completed | error` and
/// `interrupted -> running`; the two terminal states accept no further
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Interrupted,
    Completed,
    Error,
}

impl ExecutionStatus {
    /// Whether this status accepts no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Error)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: ExecutionStatus) -> bool {
        match self {
            ExecutionStatus::Running => matches!(
                next,
                ExecutionStatus::Interrupted
                    | ExecutionStatus::Completed
                    | ExecutionStatus::Error
            ),
            ExecutionStatus::Interrupted => matches!(next, ExecutionStatus::Running),
            ExecutionStatus::Completed | ExecutionStatus::Error => false,
        }
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Interrupted => "interrupted",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in an execution's stage log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageLogEntry {
    pub stage: String,
    pub status: ExecutionStatus,
    pub at: DateTime<Utc>,
}

/// A live, in-memory record of one computation instance.
///
/// Records are owned by the registry and mutated only through its methods;
/// callers receive snapshot copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Registry-assigned identifier, unique for the registry's lifetime.
    pub id: String,
    /// Key under which this execution's durable state is stored.
    pub checkpoint_key: String,
    /// Immutable initial parameters from the create request.
    pub input: Value,
    pub status: ExecutionStatus,
    /// Stage the computation is paused at or currently executing.
    pub current_stage: Option<String>,
    /// Suspended-state payload; present exactly while `interrupted`. The
    /// durable copy on disk is unaffected by this field.
    pub snapshot: Option<Value>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Append-only log of stages and transitions, oldest first.
    pub stage_log: Vec<StageLogEntry>,
}

impl ExecutionRecord {
    pub fn new(
        id: impl Into<String>,
        checkpoint_key: impl Into<String>,
        input: Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            checkpoint_key: checkpoint_key.into(),
            input,
            status: ExecutionStatus::Running,
            current_stage: None,
            snapshot: None,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            stage_log: vec![StageLogEntry {
                stage: "created".to_string(),
                status: ExecutionStatus::Running,
                at: now,
            }],
        }
    }

    /// Pending tool calls projected from the suspended snapshot, if any.
    pub fn pending_tool_calls(&self) -> Vec<PendingToolCall> {
        self.snapshot
            .as_ref()
            .map(pending_tool_calls)
            .unwrap_or_default()
    }

    fn log_entry(&mut self, stage: &str) {
        let now = Utc::now();
        self.stage_log.push(StageLogEntry {
            stage: stage.to_string(),
            status: self.status,
            at: now,
        });
        self.updated_at = now;
    }

    fn ensure_running(&self) -> Result<()> {
        if self.status != ExecutionStatus::Running {
            return Err(CoreError::NotRunning {
                id: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    /// Record that the driver has picked this execution up.
    pub(crate) fn mark_started(&mut self) {
        self.log_entry("started");
    }

    /// Record a progress report from the running computation.
    pub(crate) fn record_stage(&mut self, stage: &str) {
        self.current_stage = Some(stage.to_string());
        self.log_entry(stage);
    }

    pub(crate) fn mark_interrupted(&mut self, stage: &str, snapshot: Value) -> Result<()> {
        self.ensure_running()?;
        self.status = ExecutionStatus::Interrupted;
        self.snapshot = Some(snapshot);
        self.current_stage = Some(stage.to_string());
        self.log_entry(stage);
        Ok(())
    }

    pub(crate) fn mark_completed(&mut self, result: String) -> Result<()> {
        self.ensure_running()?;
        self.status = ExecutionStatus::Completed;
        self.snapshot = None;
        self.result = Some(result);
        self.log_entry("completed");
        Ok(())
    }

    pub(crate) fn mark_error(&mut self, detail: String) -> Result<()> {
        self.ensure_running()?;
        self.status = ExecutionStatus::Error;
        self.snapshot = None;
        self.error = Some(detail);
        self.log_entry("failed");
        Ok(())
    }

    /// Move `interrupted -> running` for a resume. Drops the in-memory
    /// snapshot; the durable checkpoint and any overlay stay on disk for the
    /// computation to rehydrate from.
    pub(crate) fn mark_resumed(&mut self) -> Result<()> {
        if self.status != ExecutionStatus::Interrupted {
            return Err(CoreError::NotInterrupted {
                id: self.id.clone(),
                status: self.status,
            });
        }
        self.status = ExecutionStatus::Running;
        self.snapshot = None;
        self.log_entry("resumed");
        Ok(())
    }

    /// Overwrite the arguments of the last pending tool call in the
    /// in-memory snapshot.
    pub(crate) fn update_tool_arguments(&mut self, new_args: &str) -> Result<()> {
        let snapshot = match self.snapshot.as_mut() {
            Some(snapshot) => snapshot,
            None => return Err(CoreError::NoSnapshot(self.id.clone())),
        };
        if let Err(source) = patch_last_pending_call(snapshot, new_args) {
            return Err(CoreError::NoPendingCall {
                id: self.id.clone(),
                source,
            });
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn suspended_snapshot() -> Value {
        json!({
            "message_history": [
                {
                    "role": "assistant",
                    "tool_calls": [
                        {"id": "call-1", "name": "BookTicket", "arguments": "{\"location\":\"Beijing\"}"}
                    ]
                }
            ]
        })
    }

    #[test]
    fn new_records_start_running_with_a_creation_entry() {
        let record = ExecutionRecord::new("exec-1", "key-1", json!({"name": "Megumin"}));
        assert_eq!(record.status, ExecutionStatus::Running);
        assert!(record.snapshot.is_none());
        assert_eq!(record.stage_log.len(), 1);
        assert_eq!(record.stage_log[0].stage, "created");
    }

    #[test]
    fn state_machine_closure() {
        use ExecutionStatus::*;

        assert!(Running.can_transition_to(Interrupted));
        assert!(Running.can_transition_to(Completed));
        assert!(Running.can_transition_to(Error));
        assert!(!Running.can_transition_to(Running));

        assert!(Interrupted.can_transition_to(Running));
        assert!(!Interrupted.can_transition_to(Completed));
        assert!(!Interrupted.can_transition_to(Error));

        for terminal in [Completed, Error] {
            assert!(terminal.is_terminal());
            for next in [Running, Interrupted, Completed, Error] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn interrupt_attaches_snapshot_and_resume_clears_it() {
        let mut record = ExecutionRecord::new("exec-1", "key-1", json!({}));
        record
            .mark_interrupted("confirm_booking", suspended_snapshot())
            .unwrap();
        assert_eq!(record.status, ExecutionStatus::Interrupted);
        assert!(record.snapshot.is_some());
        assert_eq!(record.current_stage.as_deref(), Some("confirm_booking"));

        record.mark_resumed().unwrap();
        assert_eq!(record.status, ExecutionStatus::Running);
        assert!(record.snapshot.is_none());
    }

    #[test]
    fn terminal_states_are_absorbing() {
        let mut record = ExecutionRecord::new("exec-1", "key-1", json!({}));
        record.mark_completed("done".to_string()).unwrap();

        assert!(record.mark_resumed().is_err());
        assert!(record
            .mark_interrupted("again", suspended_snapshot())
            .is_err());
        assert!(record.mark_error("late failure".to_string()).is_err());
        assert_eq!(record.status, ExecutionStatus::Completed);
        assert_eq!(record.result.as_deref(), Some("done"));
    }

    #[test]
    fn error_outcome_records_detail_and_clears_snapshot() {
        let mut record = ExecutionRecord::new("exec-1", "key-1", json!({}));
        record.mark_error("engine offline".to_string()).unwrap();
        assert_eq!(record.status, ExecutionStatus::Error);
        assert_eq!(record.error.as_deref(), Some("engine offline"));
        assert!(record.result.is_none());
    }

    #[test]
    fn update_tool_arguments_rewrites_the_pending_call() {
        let mut record = ExecutionRecord::new("exec-1", "key-1", json!({}));
        record
            .mark_interrupted("confirm_booking", suspended_snapshot())
            .unwrap();

        record
            .update_tool_arguments("{\"location\":\"Shanghai\"}")
            .unwrap();

        let pending = record.pending_tool_calls();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].arguments, "{\"location\":\"Shanghai\"}");
    }

    #[test]
    fn update_tool_arguments_without_snapshot_is_rejected() {
        let mut record = ExecutionRecord::new("exec-1", "key-1", json!({}));
        let err = record.update_tool_arguments("{}").unwrap_err();
        assert!(matches!(err, CoreError::NoSnapshot(_)));
    }

    #[test]
    fn update_tool_arguments_without_pending_call_leaves_record_unchanged() {
        let mut record = ExecutionRecord::new("exec-1", "key-1", json!({}));
        record
            .mark_interrupted("waiting", json!({"message_history": [{"role": "user"}]}))
            .unwrap();

        let before = record.snapshot.clone();
        let err = record.update_tool_arguments("{}").unwrap_err();
        assert!(matches!(err, CoreError::NoPendingCall { .. }));
        assert_eq!(record.snapshot, before);
    }

    #[test]
    fn stage_log_accumulates_transitions_in_order() {
        let mut record = ExecutionRecord::new("exec-1", "key-1", json!({}));
        record.mark_started();
        record.record_stage("compose_itinerary");
        record
            .mark_interrupted("confirm_booking", suspended_snapshot())
            .unwrap();
        record.mark_resumed().unwrap();
        record.mark_completed("done".to_string()).unwrap();

        let stages: Vec<&str> = record
            .stage_log
            .iter()
            .map(|entry| entry.stage.as_str())
            .collect();
        assert_eq!(
            stages,
            vec![
                "created",
                "started",
                "compose_itinerary",
                "confirm_booking",
                "resumed",
                "completed"
            ]
        );
        assert_eq!(
            record.stage_log.last().map(|entry| entry.status),
            Some(ExecutionStatus::Completed)
        );
    }
}
