//! HTTP host adapter.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → plain request: body → http.request → App::dispatch → streamed response
//!     → upgrade:       websocket.rs handshake → frame bridge
//! ```

pub mod server;
pub mod websocket;

pub use server::HttpServer;
