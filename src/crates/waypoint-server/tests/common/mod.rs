//! Common test utilities and setup

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use waypoint_core::{EventHub, ExecutionRegistry};
use waypoint_server::api::routes::{create_router, AppState};
use waypoint_server::flow::TravelBookingFlow;
use waypoint_store::{CheckpointStore, OverlayStore};

/// Build a full router backed by a fresh temporary data directory
pub fn setup_test_app() -> (TempDir, Router) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let checkpoints =
        CheckpointStore::new(temp_dir.path()).expect("Failed to open checkpoint store");
    let overlays = OverlayStore::new(temp_dir.path()).expect("Failed to open overlay store");
    let registry = ExecutionRegistry::new(EventHub::new());
    let flow = Arc::new(TravelBookingFlow::new(checkpoints.clone(), overlays.clone()));

    let app = create_router(AppState {
        registry,
        checkpoints,
        overlays,
        flow,
    });
    (temp_dir, app)
}

/// Send a request with an optional JSON body and decode the response.
/// Non-JSON response bodies come back as a string value so failing tests
/// can print them.
pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request"),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request"),
    };

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Router call failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

/// Poll the execution endpoint until it reports the expected status
pub async fn wait_for_status(app: &Router, id: &str, expected: &str) -> Value {
    for _ in 0..200 {
        let (status, body) = send_json(app, "GET", &format!("/api/executions/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] == expected {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("execution {} never reached status {}", id, expected);
}
