//! WebSocket upgrade handler and socket pumps.

use crate::{
    config::InvokeConfig,
    engine::Engine,
    http::not_found,
    session::{Frame, Session},
    state::Gateway,
};
use axum::{
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message as WsMessage, WebSocket, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
};
use fcore::{Route, Transport};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Client messages buffered ahead of the engine.
const INBOUND_BUFFER: usize = 16;

/// `GET /{name}`: upgrade to a session served by the protocol engine.
pub async fn upgrade(
    State(state): State<Gateway>,
    Path(name): Path<String>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(route) = state.route(&name, Transport::WebSocket) else {
        return not_found();
    };
    match ws {
        Ok(ws) => ws
            .on_upgrade(move |socket| handle_socket(socket, route, state.invoke))
            .into_response(),
        Err(rejection) => rejection.into_response(),
    }
}

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, route: Route, invoke: Arc<InvokeConfig>) {
    let name = route.name().to_owned();
    tracing::debug!("{name}: session opened");

    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Frame>();
    let (in_tx, in_rx) = mpsc::channel::<String>(INBOUND_BUFFER);

    // Writer task: the only writer of the socket.
    let send_task = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            let (message, last) = match frame {
                Frame::Text(text) => (WsMessage::Text(text.into()), false),
                Frame::Close => (WsMessage::Close(None), true),
            };
            if sender.send(message).await.is_err() || last {
                break;
            }
        }
    });

    // Reader task: forwards text frames until the peer goes away.
    let recv_task = tokio::spawn(async move {
        while let Some(message) = receiver.next().await {
            let text = match message {
                Ok(WsMessage::Text(text)) => text.as_str().to_owned(),
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!("websocket receive failed: {e}");
                    break;
                }
            };
            if in_tx.send(text).await.is_err() {
                break;
            }
        }
    });

    let session = Session::new(out_tx, in_rx, invoke.human_timeout());
    if let Err(e) = Engine::new(route, session, &invoke).run().await {
        tracing::error!("{name}: session aborted: {e}");
    }

    recv_task.abort();
    let _ = send_task.await;
    tracing::debug!("{name}: session closed");
}
