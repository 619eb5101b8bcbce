//! WebSocket Handler
//!
//! Accepts observer connections at the server root and manages their
//! lifecycle: upgrade pending (connecting), registered with the hub (open),
//! deregistered (closed). A closed observer never reopens; a reconnect is a
//! new observer.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;

use super::hub::BroadcastHub;
use crate::api::AppState;

/// WebSocket upgrade handler
///
/// This is the entry point for observer connections.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let hub = Arc::clone(&state.hub);
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, hub: Arc<BroadcastHub>) {
    let (mut sender, mut receiver) = socket.split();
    let (observer_id, mut rx) = hub.connect().await;
    let send_timeout = hub.config().send_timeout;

    // Forward hub messages to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            let text = match update.to_json() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize reading update");
                    continue;
                }
            };

            match tokio::time::timeout(send_timeout, sender.send(Message::Text(text))).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::debug!(observer_id = %observer_id, error = %e, "WebSocket send failed");
                    break;
                }
                Err(_) => {
                    tracing::debug!(observer_id = %observer_id, "WebSocket send timed out");
                    break;
                }
            }
        }
    });

    // Observers are receive-only; drain their frames until they go away
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    tracing::debug!(observer_id = %observer_id, "Client requested close");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(observer_id = %observer_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    hub.deregister(&observer_id).await;
}
