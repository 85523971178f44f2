//! Live stream transports (SSE and WebSocket) over BroadcastHub subscriptions
//!
//! Both transports end the subscription when the client goes away: axum drops
//! the SSE body stream on disconnect, and the WebSocket loop aborts its
//! forwarding task. Dropping the `Subscription` unregisters it from the hub.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{
        sse::{Event, Sse},
        IntoResponse,
    },
};
use futures::{SinkExt, Stream, StreamExt};
use serde::Serialize;

use crate::broadcast_hub::{HubEvent, Subscription};
use crate::models::StreamFrame;
use crate::state::AppState;

const KEEPALIVE_COMMENT: &str = "keepalive";

fn frame<T: Serialize>(value: &T) -> StreamFrame<'_, T> {
    StreamFrame {
        value,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Turn a subscription into an SSE response
///
/// One `data:` event per published value, a `:keepalive` comment on idle.
pub fn sse_response<T>(
    subscription: Subscription<T>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>>
where
    T: Serialize + Send + 'static,
{
    let stream = subscription.into_stream().map(|event| match event {
        HubEvent::Value(value) => Event::default().json_data(frame(&value)),
        HubEvent::KeepAlive => Ok(Event::default().comment(KEEPALIVE_COMMENT)),
    });

    Sse::new(stream)
}

/// GET /api/ultrasonic/stream
pub async fn ultrasonic_stream(State(state): State<AppState>) -> impl IntoResponse {
    sse_response(state.sensor_hub.subscribe())
}

/// GET /api/camera/stream
pub async fn camera_stream(State(state): State<AppState>) -> impl IntoResponse {
    sse_response(state.detection_hub.subscribe())
}

/// WebSocket upgrade handler (ultrasonic readings)
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle WebSocket connection
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let mut subscription = state.sensor_hub.subscribe();
    let subscriber_id = subscription.id();

    tracing::info!(subscriber_id = %subscriber_id, "WebSocket client connected");

    // Forward hub events to the socket; Ping stands in for the keep-alive
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = subscription.next().await {
            let message = match event {
                HubEvent::Value(reading) => match serde_json::to_string(&frame(&reading)) {
                    Ok(json) => Message::Text(json),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize reading");
                        continue;
                    }
                },
                HubEvent::KeepAlive => Message::Ping(Vec::new()),
            };

            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    // Incoming messages only matter for close / errors
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    tracing::info!(subscriber_id = %subscriber_id, "WebSocket client closed");
                    break;
                }
                Err(e) => {
                    tracing::warn!(subscriber_id = %subscriber_id, error = %e, "WebSocket error");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    // Already gone if the send task dropped its subscription
    state.sensor_hub.unsubscribe(&subscriber_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast_hub::BroadcastHub;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_dropping_sse_body_unsubscribes() {
        let hub = Arc::new(BroadcastHub::<u32>::new("sse", Duration::from_secs(5)));
        let sse = sse_response(hub.subscribe());
        assert_eq!(hub.subscriber_count(), 1);

        // axum drops the body when the client disconnects
        drop(sse);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_stream_frame_shape() {
        let json = serde_json::to_value(frame(&42u32)).unwrap();
        assert_eq!(json["value"], 42);
        assert!(json["timestamp"].is_string());
    }
}
