//! Scoped route declarations.
//!
//! A [`RouteBuilder`] borrows the route table while a route is being
//! configured. Whatever happens inside the declaring block (normal
//! completion, an early `return`/`?`, or a panic), the builder commits the
//! handler it holds when it goes out of scope, unless `finish` already did.
//! A builder registers at most one route; one that never received a handler
//! commits nothing.
//!
//! ```ignore
//! {
//!     let mut route = app.get("/{name}");
//!     route.send("Hello, {name}!");
//! } // committed here
//!
//! let id = app.get("/search").send_fn(search).finish()?;
//! let id = app.ws("/chat").scoped(|route| {
//!     route.send_fn(chat);
//!     Ok::<_, RouteError>(())
//! })?;
//! ```

use axum::http::Method;
use std::future::Future;

use crate::handlers::{
    EventStream, HandlerError, ProtocolHandler, Request, ResponseHandler, SocketHandler, StreamHandler, WebSocket,
};
use crate::handlers::registry::ConnectionRegistry;
use crate::routing::params::ParameterSet;
use crate::routing::pattern::RouteError;
use crate::routing::table::{RouteId, RouteTable};

const HTML: &str = "text/html";
const JSON: &str = "application/json";

/// Builder for one route. `H` is the handler kind of the protocol family.
pub struct RouteBuilder<'a, H: Into<ProtocolHandler>> {
    table: &'a mut RouteTable,
    method: Option<Method>,
    path: String,
    handler: Option<H>,
    committed: bool,
}

impl<'a, H: Into<ProtocolHandler>> RouteBuilder<'a, H> {
    pub(crate) fn new(table: &'a mut RouteTable, method: Option<Method>, path: impl Into<String>) -> Self {
        Self {
            table,
            method,
            path: path.into(),
            handler: None,
            committed: false,
        }
    }

    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether a handler has been set (and not yet committed).
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Whether this builder has already registered its route.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Replace the handler-in-progress. Ignored once the route is committed.
    pub fn handler(&mut self, handler: H) -> &mut Self {
        if self.committed {
            tracing::warn!(path = %self.path, "Route already committed; handler ignored");
            return self;
        }
        self.handler = Some(handler);
        self
    }

    /// Commit now and report the outcome. Without a handler this is `Ok(None)`
    /// and a handler set later is still committed on drop. After a commit,
    /// further calls and the drop do nothing.
    pub fn finish(&mut self) -> Result<Option<RouteId>, RouteError> {
        self.commit()
    }

    /// Run `declare` against this builder, then commit whatever it left behind,
    /// even if `declare` failed. `declare`'s error takes precedence.
    pub fn scoped<E>(mut self, declare: impl FnOnce(&mut Self) -> Result<(), E>) -> Result<Option<RouteId>, E>
    where
        E: From<RouteError>,
    {
        let declared = declare(&mut self);
        let committed = self.commit();
        declared?;
        Ok(committed?)
    }

    fn commit(&mut self) -> Result<Option<RouteId>, RouteError> {
        if self.committed {
            return Ok(None);
        }
        let Some(handler) = self.handler.take() else {
            return Ok(None);
        };
        self.committed = true;
        self.table
            .register(self.method.clone(), &self.path, handler.into())
            .map(Some)
    }
}

impl<H: Into<ProtocolHandler>> Drop for RouteBuilder<'_, H> {
    fn drop(&mut self) {
        if let Err(error) = self.commit() {
            tracing::error!(path = %self.path, error = %error, "Route could not be registered");
        }
    }
}

impl RouteBuilder<'_, ResponseHandler> {
    /// Static HTML payload. `{name}` placeholders are filled from request parameters.
    pub fn send(&mut self, payload: impl Into<String>) -> &mut Self {
        self.send_as(payload, HTML)
    }

    pub fn send_as(&mut self, payload: impl Into<String>, content_type: &str) -> &mut Self {
        self.handler(ResponseHandler::fixed(payload, content_type))
    }

    /// HTML produced by a function of the request.
    pub fn send_fn<F>(&mut self, func: F) -> &mut Self
    where
        F: Fn(&Request) -> Result<String, HandlerError> + Send + Sync + 'static,
    {
        self.send_fn_as(func, HTML)
    }

    pub fn send_fn_as<F>(&mut self, func: F, content_type: &str) -> &mut Self
    where
        F: Fn(&Request) -> Result<String, HandlerError> + Send + Sync + 'static,
    {
        self.handler(ResponseHandler::from_fn(func, content_type))
    }

    /// Static JSON document, sent verbatim. Use `json_fn` for per-request values.
    pub fn json(&mut self, payload: impl Into<String>) -> &mut Self {
        self.handler(ResponseHandler::verbatim(payload, JSON))
    }

    pub fn json_fn<F>(&mut self, func: F) -> &mut Self
    where
        F: Fn(&Request) -> Result<String, HandlerError> + Send + Sync + 'static,
    {
        self.send_fn_as(func, JSON)
    }
}

impl RouteBuilder<'_, StreamHandler> {
    /// Resend `payload` forever at the table's repeat interval.
    pub fn send(&mut self, payload: impl Into<String>) -> &mut Self {
        let interval = self.table.repeat_interval();
        self.handler(StreamHandler::repeat(payload, interval))
    }

    pub fn send_fn<F, Fut>(&mut self, func: F) -> &mut Self
    where
        F: Fn(EventStream, ParameterSet) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.handler(StreamHandler::from_fn(func))
    }
}

impl RouteBuilder<'_, SocketHandler> {
    /// Send `payload` once, then close the socket.
    pub fn send(&mut self, payload: impl Into<String>) -> &mut Self {
        self.handler(SocketHandler::fixed(payload))
    }

    pub fn send_fn<F, Fut>(&mut self, func: F) -> &mut Self
    where
        F: Fn(WebSocket, ConnectionRegistry) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.handler(SocketHandler::from_fn(func))
    }
}
