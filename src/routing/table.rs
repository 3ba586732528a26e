//! Route storage and lookup.
//!
//! # Responsibilities
//! - Keep one ordered collection per protocol family (HTTP, SSE, WebSocket)
//! - Look up the first matching route for a path (and method, for HTTP)
//! - Remove and re-parent routes by id
//!
//! # Design Decisions
//! - Append-only registration; order is never changed except by `remount`,
//!   which moves the route to the end of its collection
//! - O(n) scan per lookup (acceptable for typical route counts)
//! - Explicit `None` rather than a silent default route

use axum::http::Method;
use std::fmt;
use std::time::Duration;

use crate::handlers::{ProtocolHandler, ResponseHandler, SocketHandler, StreamHandler};
use crate::protocol::PathParams;
use crate::routing::pattern::{RouteError, RoutePattern};

/// Table-unique identifier handed out when a route is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(u64);

impl RouteId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "route-{}", self.0)
    }
}

/// Protocol family a route belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Http,
    Sse,
    WebSocket,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Sse => "sse",
            Protocol::WebSocket => "websocket",
        }
    }
}

/// A registered route.
#[derive(Debug)]
pub struct RouteEntry<H> {
    id: RouteId,
    method: Option<Method>,
    pattern: RoutePattern,
    handler: H,
}

impl<H> RouteEntry<H> {
    pub fn id(&self) -> RouteId {
        self.id
    }

    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// A route without a method accepts every method.
    fn accepts(&self, method: &Method) -> bool {
        self.method.as_ref().map_or(true, |m| m == method)
    }
}

/// Flat description of a route, for listings and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSummary {
    pub id: RouteId,
    pub protocol: Protocol,
    pub method: Option<Method>,
    pub template: String,
}

/// Ordered route collections for one application.
#[derive(Debug)]
pub struct RouteTable {
    http: Vec<RouteEntry<ResponseHandler>>,
    sse: Vec<RouteEntry<StreamHandler>>,
    websocket: Vec<RouteEntry<SocketHandler>>,
    next_id: u64,
    repeat_interval: Duration,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl RouteTable {
    /// `repeat_interval` is the period used for SSE routes bound to a fixed payload.
    pub fn new(repeat_interval: Duration) -> Self {
        Self {
            http: Vec::new(),
            sse: Vec::new(),
            websocket: Vec::new(),
            next_id: 1,
            repeat_interval,
        }
    }

    pub fn repeat_interval(&self) -> Duration {
        self.repeat_interval
    }

    /// Compile `template` and append the route to its protocol's collection.
    pub fn register(
        &mut self,
        method: Option<Method>,
        template: &str,
        handler: ProtocolHandler,
    ) -> Result<RouteId, RouteError> {
        let pattern = RoutePattern::compile(template)?;
        let id = RouteId(self.next_id);
        self.next_id += 1;

        tracing::debug!(
            route_id = %id,
            protocol = handler.protocol().as_str(),
            method = ?method,
            template = %template,
            "Route registered"
        );

        match handler {
            ProtocolHandler::Response(handler) => self.http.push(RouteEntry { id, method, pattern, handler }),
            ProtocolHandler::Stream(handler) => self.sse.push(RouteEntry { id, method, pattern, handler }),
            ProtocolHandler::Socket(handler) => self.websocket.push(RouteEntry { id, method, pattern, handler }),
        }
        Ok(id)
    }

    /// First HTTP route whose method equals `method` and whose pattern matches.
    pub fn match_http(&self, method: &Method, path: &str) -> Option<(&RouteEntry<ResponseHandler>, PathParams)> {
        first_match(&self.http, Some(method), path)
    }

    /// First SSE route matching `path`, regardless of method.
    pub fn match_sse(&self, path: &str) -> Option<(&RouteEntry<StreamHandler>, PathParams)> {
        first_match(&self.sse, None, path)
    }

    /// First WebSocket route matching `path`.
    pub fn match_websocket(&self, path: &str) -> Option<(&RouteEntry<SocketHandler>, PathParams)> {
        first_match(&self.websocket, None, path)
    }

    /// Remove a route. Returns false if the id is unknown.
    pub fn remove(&mut self, id: RouteId) -> bool {
        let removed = take(&mut self.http, id).is_some()
            || take(&mut self.sse, id).is_some()
            || take(&mut self.websocket, id).is_some();
        if removed {
            tracing::debug!(route_id = %id, "Route removed");
        }
        removed
    }

    /// Re-register a route under `prefix`, moving it to the end of its collection.
    /// The route keeps its id. On error the table is left unchanged.
    pub fn remount(&mut self, id: RouteId, prefix: &str) -> Result<(), RouteError> {
        let outcome = match remount_in(&mut self.http, id, prefix) {
            Some(outcome) => outcome,
            None => match remount_in(&mut self.sse, id, prefix) {
                Some(outcome) => outcome,
                None => remount_in(&mut self.websocket, id, prefix).ok_or(RouteError::UnknownRoute(id))?,
            },
        };
        let template = outcome?;
        tracing::debug!(route_id = %id, template = %template, "Route remounted");
        Ok(())
    }

    /// Every route in registration order, HTTP first, then SSE, then WebSocket.
    pub fn routes(&self) -> Vec<RouteSummary> {
        let http = self.http.iter().map(|e| summary(e, Protocol::Http));
        let sse = self.sse.iter().map(|e| summary(e, Protocol::Sse));
        let websocket = self.websocket.iter().map(|e| summary(e, Protocol::WebSocket));
        http.chain(sse).chain(websocket).collect()
    }

    pub fn len(&self, protocol: Protocol) -> usize {
        match protocol {
            Protocol::Http => self.http.len(),
            Protocol::Sse => self.sse.len(),
            Protocol::WebSocket => self.websocket.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.http.len() + self.sse.len() + self.websocket.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

fn first_match<'a, H>(
    entries: &'a [RouteEntry<H>],
    method: Option<&Method>,
    path: &str,
) -> Option<(&'a RouteEntry<H>, PathParams)> {
    entries
        .iter()
        .filter(|entry| method.map_or(true, |m| entry.accepts(m)))
        .find_map(|entry| entry.pattern.matches(path).map(|params| (entry, params)))
}

fn take<H>(entries: &mut Vec<RouteEntry<H>>, id: RouteId) -> Option<RouteEntry<H>> {
    let index = entries.iter().position(|e| e.id == id)?;
    Some(entries.remove(index))
}

fn remount_in<H>(entries: &mut Vec<RouteEntry<H>>, id: RouteId, prefix: &str) -> Option<Result<String, RouteError>> {
    let index = entries.iter().position(|e| e.id == id)?;
    let pattern = match entries[index].pattern.with_prefix(prefix) {
        Ok(pattern) => pattern,
        Err(e) => return Some(Err(e)),
    };
    let template = pattern.template().to_string();
    let mut entry = entries.remove(index);
    entry.pattern = pattern;
    entries.push(entry);
    Some(Ok(template))
}

fn summary<H>(entry: &RouteEntry<H>, protocol: Protocol) -> RouteSummary {
    RouteSummary {
        id: entry.id,
        protocol,
        method: entry.method.clone(),
        template: entry.pattern.template().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(body: &str) -> ProtocolHandler {
        ResponseHandler::fixed(body, "text/plain").into()
    }

    #[test]
    fn test_register_appends_in_order() {
        let mut table = RouteTable::default();
        let a = table.register(Some(Method::GET), "/a", text("a")).unwrap();
        let b = table.register(Some(Method::GET), "/b", text("b")).unwrap();
        assert!(a < b);

        let templates: Vec<_> = table.routes().into_iter().map(|r| r.template).collect();
        assert_eq!(templates, ["/a", "/b"]);
    }

    #[test]
    fn test_first_match_wins() {
        let mut table = RouteTable::default();
        let first = table.register(Some(Method::GET), "/{name}", text("param")).unwrap();
        table.register(Some(Method::GET), "/fixed", text("fixed")).unwrap();

        let (entry, params) = table.match_http(&Method::GET, "/fixed").unwrap();
        assert_eq!(entry.id(), first);
        assert_eq!(params["name"], "fixed");
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut table = RouteTable::default();
        let first = table.register(Some(Method::GET), "/same", text("1")).unwrap();
        table.register(Some(Method::GET), "/same", text("2")).unwrap();
        assert_eq!(table.len(Protocol::Http), 2);
        assert_eq!(table.match_http(&Method::GET, "/same").unwrap().0.id(), first);
    }

    #[test]
    fn test_method_filter() {
        let mut table = RouteTable::default();
        table.register(Some(Method::POST), "/items", text("post")).unwrap();
        let get = table.register(Some(Method::GET), "/items", text("get")).unwrap();

        assert_eq!(table.match_http(&Method::GET, "/items").unwrap().0.id(), get);
        assert!(table.match_http(&Method::DELETE, "/items").is_none());
    }

    #[test]
    fn test_remove() {
        let mut table = RouteTable::default();
        let id = table.register(Some(Method::GET), "/gone", text("x")).unwrap();
        assert!(table.remove(id));
        assert!(!table.remove(id));
        assert!(table.match_http(&Method::GET, "/gone").is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_remount_moves_to_end() {
        let mut table = RouteTable::default();
        let root = table.register(Some(Method::GET), "/", text("about")).unwrap();
        table.register(Some(Method::GET), "/other", text("other")).unwrap();

        table.remount(root, "/about").unwrap();

        let routes = table.routes();
        assert_eq!(routes[0].template, "/other");
        assert_eq!(routes[1].template, "/about");
        assert_eq!(routes[1].id, root);
        assert!(table.match_http(&Method::GET, "/").is_none());
        assert!(table.match_http(&Method::GET, "/about").is_some());
    }

    #[test]
    fn test_remount_unknown_route() {
        let mut table = RouteTable::default();
        let id = table.register(Some(Method::GET), "/x", text("x")).unwrap();
        table.remove(id);
        assert!(matches!(table.remount(id, "/p"), Err(RouteError::UnknownRoute(missing)) if missing == id));
    }

    #[test]
    fn test_sse_and_websocket_collections() {
        let mut table = RouteTable::default();
        table
            .register(None, "/events", StreamHandler::repeat("tick", Duration::from_secs(1)).into())
            .unwrap();
        table
            .register(None, "/ws/{room}", SocketHandler::fixed("hi").into())
            .unwrap();

        assert_eq!(table.len(Protocol::Sse), 1);
        assert!(table.match_sse("/events").is_some());
        assert!(table.match_http(&Method::GET, "/events").is_none());
        assert_eq!(table.match_websocket("/ws/lobby").unwrap().1["room"], "lobby");
    }
}
