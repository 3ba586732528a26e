//! Live WebSocket session registry.
//!
//! # Responsibilities
//! - Track every accepted, not-yet-closed WebSocket session
//! - Fan a text message out to all (or all but one) sessions
//!
//! # Design Decisions
//! - `DashMap` keyed by session id; insert/remove from any task
//! - Broadcast walks a snapshot and re-checks membership before each send,
//!   so a session removed mid-fan-out is skipped
//! - A session whose host is gone is dropped from the registry instead of
//!   failing the whole broadcast

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::observability::metrics;
use crate::protocol::{Outbound, OutboundEvent, ProtocolError};

/// Unique identifier of a WebSocket session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ws-{}", self.0)
    }
}

/// Send handle for one registered session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    outbound: Outbound,
}

impl SessionHandle {
    pub fn new(id: SessionId, outbound: Outbound) -> Self {
        Self { id, outbound }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub async fn send_text(&self, text: &str) -> Result<(), ProtocolError> {
        self.outbound
            .send(OutboundEvent::WebSocketSend { text: text.to_string() })
            .await
    }
}

/// Shared set of connected sessions. Cloning shares the same set.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    sessions: Arc<DashMap<SessionId, SessionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: SessionHandle) {
        let id = handle.id();
        self.sessions.insert(id, handle);
        metrics::record_sessions(self.sessions.len());
        tracing::debug!(session_id = %id, sessions = self.sessions.len(), "Session registered");
    }

    /// Remove a session. Returns whether it was present, so repeated calls
    /// report the removal only once.
    pub fn remove(&self, id: SessionId) -> bool {
        let removed = self.sessions.remove(&id).is_some();
        if removed {
            metrics::record_sessions(self.sessions.len());
            tracing::debug!(session_id = %id, sessions = self.sessions.len(), "Session unregistered");
        }
        removed
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Handles of every session registered right now.
    pub fn snapshot(&self) -> Vec<SessionHandle> {
        self.sessions.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Send `text` to every session. Returns the number of deliveries.
    pub async fn broadcast(&self, text: &str) -> usize {
        self.fan_out(text, None).await
    }

    /// Send `text` to every session except `sender`.
    pub async fn broadcast_except(&self, sender: SessionId, text: &str) -> usize {
        self.fan_out(text, Some(sender)).await
    }

    async fn fan_out(&self, text: &str, skip: Option<SessionId>) -> usize {
        let mut delivered = 0;
        for handle in self.snapshot() {
            if Some(handle.id()) == skip || !self.contains(handle.id()) {
                continue;
            }
            match handle.send_text(text).await {
                Ok(()) => delivered += 1,
                Err(_) => {
                    tracing::debug!(session_id = %handle.id(), "Dropping unreachable session");
                    self.remove(handle.id());
                }
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Connection, HostChannels, Scope};

    fn session(registry: &ConnectionRegistry) -> (SessionId, HostChannels) {
        let (conn, host) = Connection::open(Scope::websocket("/chat", ""), 8);
        let id = SessionId::new();
        registry.insert(SessionHandle::new(id, conn.outbound));
        (id, host)
    }

    #[test]
    fn session_id_display() {
        let id = SessionId::new();
        assert!(id.to_string().starts_with("ws-"));
        assert_ne!(id, SessionId::new());
    }

    #[test]
    fn remove_reports_once() {
        let registry = ConnectionRegistry::new();
        let (id, _host) = session(&registry);
        assert!(registry.contains(id));
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn broadcast_reaches_every_session() {
        let registry = ConnectionRegistry::new();
        let (_a, mut host_a) = session(&registry);
        let (_b, mut host_b) = session(&registry);

        assert_eq!(registry.broadcast("hello").await, 2);
        let expected = Some(OutboundEvent::WebSocketSend { text: "hello".into() });
        assert_eq!(host_a.responses.recv().await, expected);
        assert_eq!(host_b.responses.recv().await, expected);
    }

    #[tokio::test]
    async fn broadcast_except_skips_sender() {
        let registry = ConnectionRegistry::new();
        let (a, mut host_a) = session(&registry);
        let (_b, mut host_b) = session(&registry);

        assert_eq!(registry.broadcast_except(a, "from a").await, 1);
        assert!(host_a.responses.try_recv().is_err());
        assert!(host_b.responses.try_recv().is_ok());
    }

    #[tokio::test]
    async fn removed_session_gets_nothing() {
        let registry = ConnectionRegistry::new();
        let (a, mut host_a) = session(&registry);
        let (_b, _host_b) = session(&registry);

        registry.remove(a);
        assert_eq!(registry.broadcast("later").await, 1);
        assert!(host_a.responses.try_recv().is_err());
    }

    #[tokio::test]
    async fn unreachable_session_is_pruned() {
        let registry = ConnectionRegistry::new();
        let (gone, host_gone) = session(&registry);
        let (_live, _host_live) = session(&registry);
        drop(host_gone);

        assert_eq!(registry.broadcast("ping").await, 1);
        assert!(!registry.contains(gone));
        assert_eq!(registry.len(), 1);
    }
}
