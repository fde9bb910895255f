//! WebSocket adapter: translates frames into [`ClientCommand`]s and drains
//! the session's event sink back into the socket.

use std::sync::Arc;

use axum::debug_handler;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::error::ChatError;
use crate::gateway::protocol::{ClientCommand, ServerEvent};
use crate::gateway::{Gateway, Session};
use crate::store::SqliteMessageStore;

#[debug_handler(state = crate::AppState)]
pub async fn chat_ws(
    State(gateway): State<Arc<Gateway<SqliteMessageStore>>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_session(gateway, socket))
}

async fn run_session(gateway: Arc<Gateway<SqliteMessageStore>>, socket: WebSocket) {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (mut sink, mut stream) = socket.split();

    // Writer task: the session's outbound queue is unbounded, so fan-out to
    // this client never blocks the rooms it is in; backpressure lands here.
    let writer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let Ok(frame) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(WsMessage::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let mut session = Session::new(event_tx);
    tracing::info!(session = %session.id, "client connected");

    // Per-connection FIFO: commands are handled one at a time, in order.
    while let Some(Ok(frame)) = stream.next().await {
        let text = match frame {
            WsMessage::Text(text) => text,
            WsMessage::Close(_) => break,
            _ => continue,
        };
        let cmd: ClientCommand = match serde_json::from_str(&text) {
            Ok(cmd) => cmd,
            Err(err) => {
                session.emit(ServerEvent::error(&ChatError::Validation(format!(
                    "malformed request: {err}"
                ))));
                continue;
            }
        };
        if let Err(err) = gateway.handle(&mut session, cmd).await {
            session.emit(ServerEvent::error(&err));
        }
    }

    // Runs on graceful close and on transport errors alike, so every join
    // is eventually matched by a leave visible to the room.
    gateway.disconnect(&session).await;
    tracing::info!(session = %session.id, "client disconnected");
    writer.abort();
}
