use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::broadcast::{ClientEvent, ConnectionId, RoomEvent};
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (connection, mut rx) = state.broadcaster.connect();
    state.metrics.room_connections.inc();

    info!(connection = %connection, "tracking client connected");

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize room event");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let inbound_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => handle_client_frame(&inbound_state, connection, &text),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.broadcaster.disconnect(connection);
    state.metrics.room_connections.dec();

    info!(connection = %connection, "tracking client disconnected");
}

pub(crate) fn handle_client_frame(state: &AppState, connection: ConnectionId, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(err) => {
            debug!(connection = %connection, error = %err, "ignoring malformed frame");
            return;
        }
    };

    match event {
        ClientEvent::Join { delivery_id } => {
            state.broadcaster.join(connection, delivery_id);
        }
        ClientEvent::Position { delivery_id, lat, lng } => {
            if !lat.is_finite() || !lng.is_finite() {
                debug!(connection = %connection, "ignoring non-finite position");
                return;
            }
            let frame = RoomEvent::LocationUpdate {
                delivery_id,
                lat,
                lng,
                timestamp: state.clock.now(),
            };
            state.broadcaster.publish_from(connection, delivery_id, frame);
        }
    }
}
