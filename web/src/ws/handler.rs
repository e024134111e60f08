use crate::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use hub::{subscriber_channel, Hub};
use log::*;

/// Upgrades the request and hands the socket to the broadcast hub. The client
/// receives the current location and alert log, then every update.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state.hub))
}

async fn handle_socket(socket: WebSocket, hub: Hub) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = subscriber_channel();

    let connection_id = hub.admit(tx);
    info!("WebSocket client {} connected", connection_id.as_str());

    // Forward hub frames to the client until either side goes away.
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(frame).await.is_err() {
                break;
            }
        }
    });

    // Inbound messages carry no commands; they are only logged.
    let client = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => info!(
                    "Received message from client {}: {}",
                    client.as_str(),
                    text.as_str()
                ),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.remove(&connection_id);
    info!("WebSocket client {} disconnected", connection_id.as_str());
}
