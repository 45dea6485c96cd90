//! WebSocket endpoint for live queue updates.
//!
//! GET /ws/queue
//!
//! Joins the `queue_updates` topic and forwards every committed queue event
//! as a `{type, payload}` text frame. A socket that falls behind silently
//! misses events; clients resync with `GET /api/queue`.
//!
//! Client frames:
//!   {"type": "ping", "ts": <any>}  ->  {"type": "pong", "ts": <same>}
//! Anything else is ignored.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value as JsonValue};

use crate::domains::queue::QUEUE_TOPIC;
use crate::kernel::event_bus::RecvError;
use crate::server::app::AxumAppState;

pub async fn queue_socket_handler(
    ws: WebSocketUpgrade,
    Extension(state): Extension<AxumAppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AxumAppState) {
    let bus = state.server_deps.event_bus.clone();
    let mut subscription = bus.subscribe(QUEUE_TOPIC).await;
    let subscription_id = subscription.id();
    let (mut sender, mut receiver) = socket.split();

    tracing::info!(subscription_id, "WebSocket client connected");

    let established = json!({
        "type": "connection.established",
        "payload": {
            "topic": QUEUE_TOPIC,
            "subscription_id": subscription_id,
        },
    });

    if sender
        .send(Message::Text(established.to_string()))
        .await
        .is_ok()
    {
        loop {
            tokio::select! {
                event = subscription.recv() => match event {
                    Ok(message) => {
                        if sender.send(Message::Text(message.to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(subscription_id, missed, "WebSocket client lagging, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
                incoming = receiver.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_client_message(&text) {
                            if sender.send(Message::Text(reply.to_string())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // Protocol pings are answered by axum
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(subscription_id, error = %e, "WebSocket receive failed");
                        break;
                    }
                },
            }
        }
    }

    bus.unsubscribe(subscription).await;
    tracing::info!(subscription_id, "WebSocket client disconnected");
}

/// Reply to a client text frame, if it warrants one.
pub fn handle_client_message(text: &str) -> Option<JsonValue> {
    let message: JsonValue = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed WebSocket message");
            return None;
        }
    };

    match message.get("type").and_then(JsonValue::as_str) {
        Some("ping") => Some(json!({
            "type": "pong",
            "ts": message.get("ts").cloned().unwrap_or(JsonValue::Null),
        })),
        other => {
            tracing::debug!(message_type = ?other, "Ignoring unknown WebSocket message");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_echoes_timestamp() {
        let reply = handle_client_message(r#"{"type":"ping","ts":1712345678901}"#).unwrap();
        assert_eq!(reply, json!({"type": "pong", "ts": 1712345678901u64}));

        let reply = handle_client_message(r#"{"type":"ping","ts":"abc"}"#).unwrap();
        assert_eq!(reply["ts"], "abc");
    }

    #[test]
    fn ping_without_timestamp_gets_null() {
        let reply = handle_client_message(r#"{"type":"ping"}"#).unwrap();
        assert!(reply["ts"].is_null());
    }

    #[test]
    fn unknown_and_malformed_messages_are_ignored() {
        assert_eq!(handle_client_message(r#"{"type":"subscribe"}"#), None);
        assert_eq!(handle_client_message(r#"{"no_type":true}"#), None);
        assert_eq!(handle_client_message("not json"), None);
    }
}
