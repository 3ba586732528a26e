//! Protocol handlers.
//!
//! # Data Flow
//! ```text
//! matched route
//!     → response.rs: http.response.start + one http.response.body
//!     → stream.rs:   event-stream headers, then data chunks until cancelled
//!     → socket.rs:   websocket.accept, register, user session loop
//!                         ↕
//!                    registry.rs (live sessions for broadcast)
//! ```
//!
//! # Design Decisions
//! - Static payloads are resolved into the same invocation shape as functions
//!   when the route is registered, not on every request
//! - Cancellation ends a stream or session cleanly; other handler errors
//!   propagate to the dispatcher

pub mod error;
pub mod registry;
pub mod response;
pub mod socket;
pub mod stream;

pub use error::HandlerError;
pub use registry::{ConnectionRegistry, SessionHandle, SessionId};
pub use response::{Request, ResponseHandler};
pub use socket::{SocketHandler, WebSocket};
pub use stream::{EventStream, StreamHandler};

use crate::routing::Protocol;

/// Tagged union over every handler kind a route can hold.
#[derive(Debug, Clone)]
pub enum ProtocolHandler {
    Response(ResponseHandler),
    Stream(StreamHandler),
    Socket(SocketHandler),
}

impl ProtocolHandler {
    pub fn protocol(&self) -> Protocol {
        match self {
            ProtocolHandler::Response(_) => Protocol::Http,
            ProtocolHandler::Stream(_) => Protocol::Sse,
            ProtocolHandler::Socket(_) => Protocol::WebSocket,
        }
    }
}

impl From<ResponseHandler> for ProtocolHandler {
    fn from(handler: ResponseHandler) -> Self {
        ProtocolHandler::Response(handler)
    }
}

impl From<StreamHandler> for ProtocolHandler {
    fn from(handler: StreamHandler) -> Self {
        ProtocolHandler::Stream(handler)
    }
}

impl From<SocketHandler> for ProtocolHandler {
    fn from(handler: SocketHandler) -> Self {
        ProtocolHandler::Socket(handler)
    }
}
