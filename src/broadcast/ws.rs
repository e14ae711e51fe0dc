//! Axum WebSocket upgrade handler, grounded on the teacher pack's
//! `hi-youichi-loom` `serve` crate (`app::ws_handler` / `connection::handle_socket`):
//! upgrade, split the socket, pump outbound queue to the sink half, read
//! the stream half only to detect client close.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use super::broadcaster::Broadcaster;

pub async fn ws_handler(ws: WebSocketUpgrade, State(broadcaster): State<Arc<Broadcaster>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, broadcaster))
}

async fn handle_socket(socket: WebSocket, broadcaster: Arc<Broadcaster>) {
    let conn = broadcaster.connect();
    let (mut sink, mut stream) = socket.split();

    let writer_conn = conn.clone();
    let writer = tokio::spawn(async move {
        loop {
            // Register interest before checking the queue: a push that
            // races between the drain below and the `.await` below is
            // still observed, since `Notify::notified()` latches any
            // `notify_waiters()` call made after it is constructed.
            let notified = writer_conn.notify.notified();
            let events = writer_conn.drain();
            if events.is_empty() {
                if writer_conn.is_closed() {
                    break;
                }
                notified.await;
                continue;
            }
            for event in events {
                let payload = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(error = %err, "failed to serialize server event");
                        continue;
                    }
                };
                if sink.send(Message::Text(payload)).await.is_err() {
                    writer_conn.close();
                    return;
                }
            }
        }
    });

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    conn.close();
    writer.abort();
    broadcaster.disconnect(conn.id);
    debug!(connection_id = conn.id, "websocket connection closed");
}
