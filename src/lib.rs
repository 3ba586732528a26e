//! Balboa: a minimal request-dispatch engine.
//!
//! An [`App`] holds a route table for HTTP, Server-Sent Event, and WebSocket
//! handlers. A host hands each connection to [`App::dispatch`] as a
//! [`protocol::Connection`]: a scope record plus a pair of event channels.
//! The crate ships an Axum host in [`http`].

// Core
pub mod app;
pub mod handlers;
pub mod protocol;
pub mod routing;

// Collaborators
pub mod http;
pub mod showcase;
pub mod static_files;
pub mod template;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use app::{App, DispatchError};
pub use config::AppConfig;
pub use handlers::{ConnectionRegistry, EventStream, HandlerError, Request, WebSocket};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{ParameterSet, RouteError, RouteId};
