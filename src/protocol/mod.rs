//! Host event protocol.
//!
//! # Data Flow
//! ```text
//! host accepts a connection
//!     → Scope (kind, method, decoded path + raw path, query string, headers)
//!     → Connection::open (bounded channel pair)
//!         host side:  HostChannels { events → , ← responses }
//!         app side:   Connection { scope, inbound, outbound }
//!     → App::dispatch(connection)
//! ```
//!
//! # Design Decisions
//! - Events are plain enums; the host translates them to and from the wire
//! - Channels are bounded so a slow client applies backpressure to handlers
//! - A dropped host side surfaces as `ProtocolError::Cancelled`, never a panic

pub mod connection;
pub mod event;

pub use connection::{Connection, HostChannels, Inbound, Outbound, ProtocolError};
pub use event::{decode_path, InboundEvent, OutboundEvent, PathParams, Scope, ScopeKind};
