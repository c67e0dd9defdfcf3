//! Execution API models and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use waypoint_core::{ExecutionRecord, ExecutionStatus, StageLogEntry};
use waypoint_store::PendingToolCall;

/// Request to start a new booking execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// Passenger name (required)
    pub name: String,

    /// Destination (required)
    pub location: String,
}

impl ExecuteRequest {
    /// Validate the execute request
    pub fn validate(&self) -> crate::api::error::ApiResult<()> {
        crate::api::middleware::validation::validate_not_empty(&self.name, "name")?;
        crate::api::middleware::validation::validate_not_empty(&self.location, "location")?;
        Ok(())
    }
}

/// Execution record as returned by the execution endpoints. The suspended
/// snapshot and the stage log are deliberately left out; they have their
/// own endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionView {
    pub id: String,
    pub checkpoint_key: String,
    pub input: Value,
    pub status: ExecutionStatus,
    pub current_stage: Option<String>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionView {
    /// Project an ExecutionView from a registry record
    pub fn from_record(record: ExecutionRecord) -> Self {
        Self {
            id: record.id,
            checkpoint_key: record.checkpoint_key,
            input: record.input,
            status: record.status,
            current_stage: record.current_stage,
            result: record.result,
            error: record.error,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Everything a human reviews before confirming: registry metadata plus
/// the content of the suspended snapshot. While no snapshot is attached
/// (running or terminal) the history is empty and `context` falls back to
/// the execution's input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateView {
    pub execution_id: String,
    pub status: ExecutionStatus,
    pub current_stage: Option<String>,
    pub message_history: Vec<Value>,
    pub context: Value,
    pub saved_at: Option<DateTime<Utc>>,
    pub stage_log: Vec<StageLogEntry>,
    pub pending_tool_calls: Vec<PendingToolCall>,
    pub result: Option<String>,
    pub error: Option<String>,
}

impl StateView {
    /// Project a StateView from a registry record
    pub fn from_record(record: &ExecutionRecord) -> Self {
        let mut view = Self {
            execution_id: record.id.clone(),
            status: record.status,
            current_stage: record.current_stage.clone(),
            message_history: Vec::new(),
            context: record.input.clone(),
            saved_at: Some(record.created_at),
            stage_log: record.stage_log.clone(),
            pending_tool_calls: record.pending_tool_calls(),
            result: record.result.clone(),
            error: record.error.clone(),
        };
        if let Some(snapshot) = record.snapshot.as_ref() {
            view.message_history = snapshot
                .get("message_history")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            view.context = snapshot.get("context").cloned().unwrap_or(Value::Null);
            view.saved_at = snapshot
                .get("saved_at")
                .and_then(Value::as_str)
                .and_then(|raw| raw.parse().ok());
        }
        view
    }
}

/// Stage-by-stage progress log of an execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageLogView {
    pub execution_id: String,
    pub entries: Vec<StageLogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execute_request_validation() {
        let req = ExecuteRequest {
            name: "Megumin".to_string(),
            location: "Beijing".to_string(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_execute_request_rejects_empty_fields() {
        let req = ExecuteRequest {
            name: "".to_string(),
            location: "Beijing".to_string(),
        };
        assert!(req.validate().is_err());

        let req = ExecuteRequest {
            name: "Megumin".to_string(),
            location: "  ".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_execution_view_omits_snapshot() {
        let record = ExecutionRecord::new(
            "exec-1".to_string(),
            "key-1",
            json!({"name": "Megumin", "location": "Beijing"}),
        );
        let view = ExecutionView::from_record(record);
        let value = serde_json::to_value(&view).unwrap();

        assert_eq!(value["id"], "exec-1");
        assert_eq!(value["status"], "running");
        assert!(value.get("snapshot").is_none());
        assert!(value.get("stage_log").is_none());
    }

    #[test]
    fn test_state_view_projects_snapshot_content() {
        let mut record = ExecutionRecord::new(
            "exec-1",
            "key-1",
            json!({"name": "Megumin", "location": "Beijing"}),
        );
        record.status = ExecutionStatus::Interrupted;
        record.current_stage = Some("confirm_booking".to_string());
        record.snapshot = Some(json!({
            "stage": "confirm_booking",
            "context": {"name": "Megumin", "location": "Beijing"},
            "saved_at": "2026-08-25T12:00:00Z",
            "message_history": [
                {"role": "user", "content": "Book a flight ticket to Beijing for Megumin."},
                {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [
                        {"id": "call_0", "name": "BookTicket", "arguments": "{\"location\":\"Beijing\"}"}
                    ]
                }
            ]
        }));

        let view = StateView::from_record(&record);
        assert_eq!(view.message_history.len(), 2);
        assert_eq!(view.message_history[0]["role"], "user");
        assert_eq!(view.message_history[1]["role"], "assistant");
        assert_eq!(
            view.context,
            json!({"name": "Megumin", "location": "Beijing"})
        );
        assert!(view.saved_at.is_some());
        assert_eq!(view.pending_tool_calls.len(), 1);
        assert_eq!(view.pending_tool_calls[0].name, "BookTicket");
        assert!(view.result.is_none());
    }

    #[test]
    fn test_state_view_falls_back_to_input_without_snapshot() {
        let mut record = ExecutionRecord::new(
            "exec-1",
            "key-1",
            json!({"name": "Megumin", "location": "Beijing"}),
        );
        record.status = ExecutionStatus::Completed;
        record.result = Some("booked".to_string());

        let view = StateView::from_record(&record);
        assert!(view.message_history.is_empty());
        assert_eq!(
            view.context,
            json!({"name": "Megumin", "location": "Beijing"})
        );
        assert_eq!(view.saved_at, Some(record.created_at));
        assert!(view.pending_tool_calls.is_empty());
        assert_eq!(view.result.as_deref(), Some("booked"));
        assert!(!view.stage_log.is_empty());
    }
}
