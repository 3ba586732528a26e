//! Channel-backed `receive` / `send` primitives.
//!
//! # Responsibilities
//! - Pair a host with one application task per connection
//! - Map a vanished peer to `ProtocolError::Cancelled`
//!
//! # Design Decisions
//! - `Outbound` is cheap to clone so the session registry can hold send handles
//! - `Inbound` has a single owner; receiving requires `&mut`

use tokio::sync::mpsc;

use crate::protocol::event::{InboundEvent, OutboundEvent, Scope};

/// Errors raised by the event primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The host side of the connection went away.
    #[error("connection cancelled")]
    Cancelled,
    /// The session was closed locally and can no longer send.
    #[error("session already closed")]
    Closed,
}

/// Receiving half held by the application.
#[derive(Debug)]
pub struct Inbound {
    rx: mpsc::Receiver<InboundEvent>,
}

impl Inbound {
    /// Await the next inbound event.
    pub async fn receive(&mut self) -> Result<InboundEvent, ProtocolError> {
        self.rx.recv().await.ok_or(ProtocolError::Cancelled)
    }
}

/// Sending half held by the application.
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: mpsc::Sender<OutboundEvent>,
}

impl Outbound {
    /// Emit one outbound event, waiting for channel capacity.
    pub async fn send(&self, event: OutboundEvent) -> Result<(), ProtocolError> {
        self.tx.send(event).await.map_err(|_| ProtocolError::Cancelled)
    }

    /// Whether the host has stopped listening.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the host drops its receiving end.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Host-side ends of a connection.
#[derive(Debug)]
pub struct HostChannels {
    /// Feed inbound events to the application.
    pub events: mpsc::Sender<InboundEvent>,
    /// Collect outbound events from the application.
    pub responses: mpsc::Receiver<OutboundEvent>,
}

/// Everything the dispatcher needs to serve one connection.
#[derive(Debug)]
pub struct Connection {
    pub scope: Scope,
    pub inbound: Inbound,
    pub outbound: Outbound,
}

impl Connection {
    /// Open a connection with bounded channels of the given capacity.
    pub fn open(scope: Scope, capacity: usize) -> (Self, HostChannels) {
        let (event_tx, event_rx) = mpsc::channel(capacity.max(1));
        let (response_tx, response_rx) = mpsc::channel(capacity.max(1));

        let connection = Self {
            scope,
            inbound: Inbound { rx: event_rx },
            outbound: Outbound { tx: response_tx },
        };
        let host = HostChannels {
            events: event_tx,
            responses: response_rx,
        };
        (connection, host)
    }
}
