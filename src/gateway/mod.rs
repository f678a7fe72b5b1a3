pub mod connection;
pub mod dispatcher;
pub mod events;
pub mod relay;
pub mod rooms;
pub mod session;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};

use crate::state::AppState;
use connection::{Connection, Flow};

pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (mut connection, mut rx) = Connection::open(state);

    loop {
        tokio::select! {
            // Outgoing messages from the session channel
            Some(msg) = rx.recv() => {
                if ws_sink.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }
            // Incoming messages
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Flow::Close { code, reason } = connection.handle_text(text.as_str()) {
                            // Deliver whatever was queued (e.g. auth-failed) before closing.
                            while let Ok(queued) = rx.try_recv() {
                                if ws_sink.send(Message::Text(queued.into())).await.is_err() {
                                    break;
                                }
                            }
                            let frame = CloseFrame {
                                code,
                                reason: Utf8Bytes::from_static(reason),
                            };
                            let _ = ws_sink.send(Message::Close(Some(frame))).await;
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }

    connection.close();
}
