//! Helpers over the opaque snapshot document
//!
//! A suspended computation's state is persisted as a structured JSON
//! document that the core never interprets, with one exception: the
//! confirmation workflow needs to locate and rewrite the arguments of the
//! pending tool call. The expected shape along that path is
//! `message_history[*].tool_calls[*].{id, name, arguments}`, where
//! `arguments` is a JSON-encoded string. Everything else in the document
//! passes through untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised when the snapshot does not carry the expected patch path
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SnapshotError {
    /// The document has no (non-empty) message history
    #[error("snapshot has no message history")]
    MissingHistory,

    /// No message in the history carries a pending tool call
    #[error("no pending tool call found to update")]
    NoPendingCall,
}

/// A proposed tool invocation awaiting human confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingToolCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded argument payload
    pub arguments: String,
}

/// Borrow the snapshot's message history, if present.
pub fn message_history(snapshot: &Value) -> Option<&Vec<Value>> {
    snapshot.get("message_history").and_then(Value::as_array)
}

/// Tool calls still awaiting execution: the calls of the trailing message,
/// if the history ends on an unanswered assistant tool-call message. Only
/// an assistant message can propose calls; a `tool_calls` key on any other
/// role is not a pending action.
pub fn pending_tool_calls(snapshot: &Value) -> Vec<PendingToolCall> {
    let Some(last) = message_history(snapshot).and_then(|history| history.last()) else {
        return Vec::new();
    };
    if last.get("role").and_then(Value::as_str) != Some("assistant") {
        return Vec::new();
    }
    let Some(calls) = last.get("tool_calls").and_then(Value::as_array) else {
        return Vec::new();
    };

    calls
        .iter()
        .map(|call| PendingToolCall {
            id: string_field(call, "id"),
            name: string_field(call, "name"),
            arguments: string_field(call, "arguments"),
        })
        .collect()
}

/// Overwrite the arguments of the most recent pending tool call.
///
/// Scans the message history backwards for the most recent message carrying
/// at least one tool call and rewrites the arguments of the *last* call in
/// that message. Fails if the history is absent or no message carries a
/// tool call.
pub fn patch_last_pending_call(
    snapshot: &mut Value,
    new_args: &str,
) -> std::result::Result<(), SnapshotError> {
    let history = snapshot
        .get_mut("message_history")
        .and_then(Value::as_array_mut)
        .filter(|history| !history.is_empty())
        .ok_or(SnapshotError::MissingHistory)?;

    for message in history.iter_mut().rev() {
        let Some(calls) = message.get_mut("tool_calls").and_then(Value::as_array_mut) else {
            continue;
        };
        if let Some(call) = calls.last_mut().and_then(Value::as_object_mut) {
            call.insert(
                "arguments".to_string(),
                Value::String(new_args.to_string()),
            );
            return Ok(());
        }
    }

    Err(SnapshotError::NoPendingCall)
}

fn string_field(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
