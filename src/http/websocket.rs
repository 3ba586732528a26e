//! WebSocket bridging.
//!
//! # Responsibilities
//! - Announce the connection with `websocket.connect`
//! - Upgrade only once the application answers `websocket.accept`;
//!   a `websocket.close` first becomes 403
//! - Forward frames in both directions until either side closes
//!
//! # Data Flow
//! ```text
//! Client ──text frames──→ reader task ──websocket.receive──→ App
//! Client ←─text frames─── writer task ←─websocket.send────── App
//! ```
//!
//! # Design Decisions
//! - Binary frames are forwarded as text when they are valid UTF-8
//! - Ping/pong is left to axum
//! - Shutdown closes every bridged socket

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use crate::http::server::ServerState;
use crate::protocol::{HostChannels, InboundEvent, OutboundEvent, Scope};

/// Run the handshake with the application, then upgrade or reject.
pub(crate) async fn accept(state: &ServerState, scope: Scope, upgrade: WebSocketUpgrade) -> Response {
    let path = scope.path.clone();
    let mut host = state.spawn_dispatch(scope);
    let _ = host.events.send(InboundEvent::WebSocketConnect).await;

    match host.responses.recv().await {
        Some(OutboundEvent::WebSocketAccept) => {
            tracing::debug!(path = %path, "WebSocket accepted");
            let shutdown = state.shutdown.subscribe();
            upgrade.on_upgrade(move |socket| bridge(socket, host, shutdown))
        }
        Some(OutboundEvent::WebSocketClose) | None => {
            tracing::debug!(path = %path, "WebSocket rejected");
            (StatusCode::FORBIDDEN, "Forbidden").into_response()
        }
        Some(other) => {
            tracing::error!(path = %path, event = other.event_type(), "Expected websocket.accept");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

async fn bridge(socket: WebSocket, host: HostChannels, mut shutdown: broadcast::Receiver<()>) {
    let HostChannels { events, mut responses } = host;
    let (mut sender, mut receiver) = socket.split();

    // Client → application
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(text) => text.as_str().to_owned(),
                Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => text,
                    Err(_) => {
                        tracing::debug!("Dropping non UTF-8 binary frame");
                        continue;
                    }
                },
                Message::Close(_) => break,
                _ => continue,
            };
            if events.send(InboundEvent::WebSocketReceive { text }).await.is_err() {
                return;
            }
        }
        let _ = events.send(InboundEvent::WebSocketDisconnect).await;
    });

    // Application → client
    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                event = responses.recv() => match event {
                    Some(OutboundEvent::WebSocketSend { text }) => {
                        if sender.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(OutboundEvent::WebSocketClose) | None => {
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                    Some(other) => {
                        tracing::trace!(event = other.event_type(), "Ignoring event on WebSocket");
                    }
                },
                Ok(()) = shutdown.recv() => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    }

    tracing::debug!("WebSocket connection closed");
}
