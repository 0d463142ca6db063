use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use super::api::AppState;
use crate::ble_notifier::Notification;

/// Raw sentence stream. Subscribing happens before the upgrade completes,
/// so a client sees every line published after its request and nothing older.
pub async fn nmea_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let rx = state.hub.subscribe();
    ws.on_upgrade(move |socket| forward(socket, rx, "nmea", |line: Arc<str>| line.to_string()))
}

/// Notifications of all three topics, one JSON object per message.
pub async fn ble_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let rx = state.table.subscribe();
    ws.on_upgrade(move |socket| forward(socket, rx, "ble", render_notification))
}

pub fn render_notification(n: Notification) -> String {
    format!(r#"{{"topic":"{}","value":{}}}"#, n.topic.as_str(), n.payload)
}

async fn forward<T, F>(socket: WebSocket, mut rx: broadcast::Receiver<T>, channel: &'static str, render: F)
where
    T: Clone + Send + 'static,
    F: Fn(T) -> String + Send + 'static,
{
    let (mut ws_tx, mut ws_rx) = socket.split();
    info!("WebSocket client subscribed to {}", channel);

    loop {
        tokio::select! {
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!("WebSocket error on {}: {}", channel, e);
                        break;
                    }
                    // Transmit-only channel
                    Some(Ok(_)) => {}
                }
            }

            item = rx.recv() => {
                match item {
                    Ok(item) => {
                        if ws_tx.send(Message::Text(render(item))).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!("WebSocket client on {} lagged, {} messages skipped", channel, n);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    info!("WebSocket client left {}", channel);
}

pub fn create_ws_router(state: AppState) -> Router {
    Router::new()
        .route("/nmea", get(nmea_stream))
        .route("/ble", get(ble_stream))
        .with_state(state)
}
