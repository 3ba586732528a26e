//! WebSocket sessions.
//!
//! # Responsibilities
//! - Accept the connection and register it for broadcast
//! - Classify inbound events into messages and disconnects
//! - Release registry membership on close, disconnect, or drop
//!
//! # Data Flow
//! ```text
//! invoke → accept → registry.insert → user future(WebSocket, registry)
//!                                         │
//!          websocket.receive ─────────────┤ receive() / next_message()
//!          websocket.disconnect ──────────┘ → registry.remove, None
//! ```

use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::handlers::error::HandlerError;
use crate::handlers::registry::{ConnectionRegistry, SessionHandle, SessionId};
use crate::protocol::{Connection, Inbound, InboundEvent, Outbound, OutboundEvent, ProtocolError, Scope};
use crate::routing::ParameterSet;

/// One WebSocket session as seen by a handler.
#[derive(Debug)]
pub struct WebSocket {
    id: SessionId,
    scope: Scope,
    params: ParameterSet,
    inbound: Inbound,
    outbound: Outbound,
    registry: ConnectionRegistry,
    accepted: bool,
    connected: bool,
    closed: bool,
}

impl WebSocket {
    pub fn new(connection: Connection, params: ParameterSet, registry: ConnectionRegistry) -> Self {
        let Connection { scope, inbound, outbound } = connection;
        Self {
            id: SessionId::new(),
            scope,
            params,
            inbound,
            outbound,
            registry,
            accepted: false,
            connected: true,
            closed: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// False once the peer disconnected or the session was closed.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Send handle other tasks can use to reach this session.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(self.id, self.outbound.clone())
    }

    /// Emit `websocket.accept`. Calling it again does nothing.
    pub async fn accept(&mut self) -> Result<(), ProtocolError> {
        if self.accepted {
            return Ok(());
        }
        self.outbound.send(OutboundEvent::WebSocketAccept).await?;
        self.accepted = true;
        Ok(())
    }

    /// Add this session to the registry.
    pub fn register(&self) {
        self.registry.insert(self.handle());
    }

    pub async fn send(&self, text: &str) -> Result<(), ProtocolError> {
        if self.closed {
            return Err(ProtocolError::Closed);
        }
        self.outbound
            .send(OutboundEvent::WebSocketSend { text: text.to_string() })
            .await
    }

    /// Wait for the next inbound event.
    ///
    /// A text frame yields `Some(text)`. A disconnect (or a vanished host)
    /// marks the session disconnected, unregisters it and yields `None`.
    /// Any other event yields `None` without changing state.
    pub async fn receive(&mut self) -> Option<String> {
        match self.inbound.receive().await {
            Ok(InboundEvent::WebSocketReceive { text }) => Some(text),
            Ok(InboundEvent::WebSocketDisconnect) | Err(_) => {
                self.mark_disconnected();
                None
            }
            Ok(other) => {
                tracing::trace!(session_id = %self.id, event = other.event_type(), "Ignoring event");
                None
            }
        }
    }

    /// Next non-empty message, or `None` once the peer has disconnected.
    pub async fn next_message(&mut self) -> Option<String> {
        while self.connected {
            match self.receive().await {
                Some(text) if !text.is_empty() => return Some(text),
                _ => continue,
            }
        }
        None
    }

    /// Unregister and emit `websocket.close`.
    pub async fn close(&mut self) -> Result<(), ProtocolError> {
        if self.closed {
            return Ok(());
        }
        self.registry.remove(self.id);
        self.closed = true;
        self.connected = false;
        self.outbound.send(OutboundEvent::WebSocketClose).await
    }

    /// Send `text` to every session in `registry`. Returns the delivered count.
    pub async fn broadcast(&self, registry: &ConnectionRegistry, text: &str) -> usize {
        registry.broadcast(text).await
    }

    fn mark_disconnected(&mut self) {
        if self.connected {
            tracing::debug!(session_id = %self.id, path = %self.scope.path, "Client disconnected");
        }
        self.connected = false;
        self.registry.remove(self.id);
    }
}

impl Drop for WebSocket {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

pub type SocketFn = Arc<dyn Fn(WebSocket, ConnectionRegistry) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// Handler for a WebSocket route.
#[derive(Clone)]
pub struct SocketHandler {
    func: SocketFn,
}

impl fmt::Debug for SocketHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketHandler").finish_non_exhaustive()
    }
}

impl SocketHandler {
    pub fn from_fn<F, Fut>(func: F) -> Self
    where
        F: Fn(WebSocket, ConnectionRegistry) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |socket, registry| Box::pin(func(socket, registry))),
        }
    }

    /// Send `payload` once, then close.
    pub fn fixed(payload: impl Into<String>) -> Self {
        let payload: Arc<str> = Arc::from(payload.into());
        Self::from_fn(move |socket, _registry| send_once(socket, payload.clone()))
    }

    /// Accept, register, then hand the session to the user future.
    pub async fn invoke(
        &self,
        connection: Connection,
        params: ParameterSet,
        registry: ConnectionRegistry,
    ) -> Result<(), HandlerError> {
        let mut socket = WebSocket::new(connection, params, registry.clone());
        let outcome = match socket.accept().await {
            Ok(()) => {
                socket.register();
                (self.func)(socket, registry).await
            }
            Err(e) => Err(e.into()),
        };

        match outcome {
            Err(e) if e.is_cancellation() => {
                tracing::debug!("WebSocket session cancelled by host");
                Ok(())
            }
            other => other,
        }
    }
}

async fn send_once(mut socket: WebSocket, payload: Arc<str>) -> Result<(), HandlerError> {
    socket.send(&payload).await?;
    socket.close().await?;
    Ok(())
}
