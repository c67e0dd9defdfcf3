//! WebSocket event streaming
//!
//! `GET /ws/events/:id` upgrades to a WebSocket and forwards every
//! lifecycle event published for that execution as a JSON text frame.
//! Events published before the upgrade are not replayed; a dashboard is
//! expected to fetch the current state over REST and then follow along
//! here.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};

/// Subscribe to the live event stream of one execution
///
/// GET /ws/events/:id
pub async fn events(
    ws: WebSocketUpgrade,
    Path(id): Path<String>,
    State(app_state): State<crate::api::routes::AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_events(socket, app_state, id))
}

async fn stream_events(
    mut socket: WebSocket,
    app_state: crate::api::routes::AppState,
    execution_id: String,
) {
    let mut subscription = app_state.registry.hub().subscribe(&execution_id);
    tracing::debug!("WebSocket subscriber attached: {}", execution_id);

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else { break };
                let Ok(text) = event.to_json() else { continue };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                    // Pings are answered by axum itself; everything else
                    // from the client is ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::debug!("WebSocket subscriber detached: {}", execution_id);
}
