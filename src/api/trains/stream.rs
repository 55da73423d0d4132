/// WebSocket stream of per-tick snapshots. Clients get the current snapshot
/// on connect, then one message per published tick.
use crate::api::AppState;
use crate::models::Snapshot;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
enum ServerMessage<'a> {
    /// Initial connection acknowledgment
    Connected { message: &'a str },
    /// A freshly published snapshot
    Snapshot { snapshot: &'a Snapshot },
}

#[utoipa::path(
    get,
    path = "/api/trains/stream",
    responses(
        (status = 101, description = "WebSocket upgrade; pushes one snapshot message per simulation tick")
    ),
    tag = "trains"
)]
pub async fn stream_positions(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut snapshots = state.runtime.subscribe_snapshots();

    let hello = ServerMessage::Connected {
        message: "live train positions",
    };
    if send_json(&mut sender, &hello).await.is_err() {
        return;
    }

    let current = state.runtime.snapshot().await;
    if send_snapshot(&mut sender, &current).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            received = snapshots.recv() => match received {
                Ok(snapshot) => {
                    if send_snapshot(&mut sender, &snapshot).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    // Slow consumer: skip ahead to the latest snapshot.
                    debug!(missed, "WebSocket client lagged behind snapshot stream");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {
                    // Clients have nothing to say; ignore pings and text.
                }
                Some(Err(e)) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
            },
        }
    }
}

async fn send_snapshot(
    sender: &mut (impl SinkExt<Message> + Unpin),
    snapshot: &Arc<Snapshot>,
) -> Result<(), ()> {
    send_json(
        sender,
        &ServerMessage::Snapshot {
            snapshot: snapshot.as_ref(),
        },
    )
    .await
}

async fn send_json(
    sender: &mut (impl SinkExt<Message> + Unpin),
    message: &impl Serialize,
) -> Result<(), ()> {
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Failed to serialize WebSocket message");
            return Err(());
        }
    };
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}
