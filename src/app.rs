//! Application object and connection dispatcher.
//!
//! # Responsibilities
//! - Own the route table, static mount, and WebSocket registry
//! - Hand out route builders for every protocol family
//! - Route one connection to the static mount, a handler, or a 404
//!
//! # Data Flow
//! ```text
//! Connection (scope + channels)
//!     → http:      static prefix? → StaticMount::serve
//!                  HTTP routes (method + path) → ResponseHandler
//!                  SSE routes (path)           → StreamHandler
//!                  otherwise                   → 404 "Not Found"
//!     → websocket: WebSocket routes (path)     → SocketHandler
//!                  otherwise                   → websocket.close
//! ```
//!
//! # Design Decisions
//! - Static serving is checked before any route
//! - Routes are declared through `&mut App`, so the table is fixed once the
//!   app is shared with the host
//! - Cancellation is a normal end of a connection, never a `DispatchError`

use axum::http::Method;
use std::path::PathBuf;
use std::time::Instant;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::handlers::response::read_body;
use crate::handlers::{ConnectionRegistry, HandlerError, Request, ResponseHandler, SocketHandler, StreamHandler};
use crate::observability::metrics;
use crate::protocol::{Connection, OutboundEvent, ProtocolError, ScopeKind};
use crate::routing::{ParameterSet, RouteBuilder, RouteError, RouteId, RouteSummary, RouteTable};
use crate::static_files::StaticMount;

/// Error escaping a dispatch.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A stream or socket handler failed.
    #[error("handler for {route} failed: {source}")]
    Handler {
        route: RouteId,
        #[source]
        source: HandlerError,
    },
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// A Balboa application.
#[derive(Debug)]
pub struct App {
    name: String,
    table: RouteTable,
    static_files: StaticMount,
    registry: ConnectionRegistry,
}

impl App {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: RouteTable::default(),
            static_files: StaticMount::default(),
            registry: ConnectionRegistry::new(),
        }
    }

    /// App with the static mount and SSE repeat interval taken from `config`.
    pub fn from_config(name: impl Into<String>, config: &AppConfig) -> Self {
        Self {
            name: name.into(),
            table: RouteTable::new(config.streaming.repeat_interval()),
            static_files: StaticMount::new(&config.static_files.url_prefix, &config.static_files.directory),
            registry: ConnectionRegistry::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// HTTP route for an arbitrary method.
    pub fn route(&mut self, method: Method, path: &str) -> RouteBuilder<'_, ResponseHandler> {
        RouteBuilder::new(&mut self.table, Some(method), path)
    }

    pub fn get(&mut self, path: &str) -> RouteBuilder<'_, ResponseHandler> {
        self.route(Method::GET, path)
    }

    pub fn post(&mut self, path: &str) -> RouteBuilder<'_, ResponseHandler> {
        self.route(Method::POST, path)
    }

    pub fn put(&mut self, path: &str) -> RouteBuilder<'_, ResponseHandler> {
        self.route(Method::PUT, path)
    }

    pub fn patch(&mut self, path: &str) -> RouteBuilder<'_, ResponseHandler> {
        self.route(Method::PATCH, path)
    }

    pub fn delete(&mut self, path: &str) -> RouteBuilder<'_, ResponseHandler> {
        self.route(Method::DELETE, path)
    }

    pub fn head(&mut self, path: &str) -> RouteBuilder<'_, ResponseHandler> {
        self.route(Method::HEAD, path)
    }

    pub fn options(&mut self, path: &str) -> RouteBuilder<'_, ResponseHandler> {
        self.route(Method::OPTIONS, path)
    }

    pub fn ws(&mut self, path: &str) -> RouteBuilder<'_, SocketHandler> {
        RouteBuilder::new(&mut self.table, None, path)
    }

    pub fn sse(&mut self, path: &str) -> RouteBuilder<'_, StreamHandler> {
        RouteBuilder::new(&mut self.table, None, path)
    }

    /// Replace the static mount.
    pub fn mount_dir(&mut self, url_prefix: &str, directory: impl Into<PathBuf>) {
        self.static_files = StaticMount::new(url_prefix, directory);
        tracing::debug!(url_prefix = %url_prefix, directory = %self.static_files.directory().display(), "Static directory mounted");
    }

    /// Move a committed route under `parent`. `/` becomes `parent` itself;
    /// any other template `t` becomes `parent + t`.
    pub fn mount_route(&mut self, parent: &str, id: RouteId) -> Result<(), RouteError> {
        self.table.remount(id, parent)
    }

    pub fn unmount(&mut self, id: RouteId) -> bool {
        self.table.remove(id)
    }

    pub fn routes(&self) -> Vec<RouteSummary> {
        self.table.routes()
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn static_files(&self) -> &StaticMount {
        &self.static_files
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Serve one connection to completion.
    pub async fn dispatch(&self, connection: Connection) -> Result<(), DispatchError> {
        let span = tracing::debug_span!(
            "dispatch",
            kind = connection.scope.kind.as_str(),
            method = %connection.scope.method,
            path = %connection.scope.path,
        );

        async move {
            let start = Instant::now();
            let outcome = match connection.scope.kind {
                ScopeKind::Http => self.dispatch_http(connection, start).await,
                ScopeKind::WebSocket => self.dispatch_websocket(connection, start).await,
            };
            match outcome {
                Err(DispatchError::Protocol(ProtocolError::Cancelled)) => {
                    tracing::debug!("Connection cancelled by host");
                    Ok(())
                }
                other => other,
            }
        }
        .instrument(span)
        .await
    }

    async fn dispatch_http(&self, connection: Connection, start: Instant) -> Result<(), DispatchError> {
        let Connection { mut scope, mut inbound, outbound } = connection;

        if self.static_files.claims(&scope.path) {
            let status = self.static_files.serve(&scope.path, &outbound).await?;
            metrics::record_request("static", status, start);
            return Ok(());
        }

        if let Some((entry, path_params)) = self.table.match_http(&scope.method, &scope.path) {
            tracing::debug!(route_id = %entry.id(), template = %entry.pattern().template(), "Matched HTTP route");
            let body = read_body(&mut inbound).await?;
            let params = ParameterSet::resolve(&path_params, &scope.query_string);
            scope.path_params = path_params;

            let request = Request::new(&scope, params, body);
            let status = entry.handler().invoke(&request, &outbound).await?;
            metrics::record_request("http", status, start);
            return Ok(());
        }

        if let Some((entry, path_params)) = self.table.match_sse(&scope.path) {
            tracing::debug!(route_id = %entry.id(), template = %entry.pattern().template(), "Matched SSE route");
            let params = ParameterSet::resolve(&path_params, &scope.query_string);
            let outcome = entry.handler().invoke(params, outbound).await;
            metrics::record_request("sse", 200, start);
            return outcome.map_err(|source| DispatchError::Handler { route: entry.id(), source });
        }

        tracing::debug!("No route matched");
        outbound.send(OutboundEvent::start(404, "text/plain")).await?;
        outbound.send(OutboundEvent::body("Not Found")).await?;
        metrics::record_request("http", 404, start);
        Ok(())
    }

    async fn dispatch_websocket(&self, mut connection: Connection, start: Instant) -> Result<(), DispatchError> {
        let Some((entry, path_params)) = self.table.match_websocket(&connection.scope.path) else {
            tracing::debug!("No WebSocket route matched");
            connection.outbound.send(OutboundEvent::WebSocketClose).await?;
            metrics::record_request("websocket", 403, start);
            return Ok(());
        };

        tracing::debug!(route_id = %entry.id(), template = %entry.pattern().template(), "Matched WebSocket route");
        let params = ParameterSet::resolve(&path_params, &connection.scope.query_string);
        connection.scope.path_params = path_params;

        let outcome = entry.handler().invoke(connection, params, self.registry.clone()).await;
        metrics::record_request("websocket", 101, start);
        outcome.map_err(|source| DispatchError::Handler { route: entry.id(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{EventStream, WebSocket};
    use crate::protocol::{HostChannels, InboundEvent, Scope};
    use axum::body::Bytes;
    use std::time::Duration;

    struct Reply {
        status: u16,
        headers: Vec<(String, String)>,
        body: String,
    }

    fn drain(host: &mut HostChannels) -> Vec<OutboundEvent> {
        let mut events = Vec::new();
        while let Ok(event) = host.responses.try_recv() {
            events.push(event);
        }
        events
    }

    async fn request(app: &App, method: Method, path: &str, query: &str, body: &str) -> Reply {
        let (conn, mut host) = Connection::open(Scope::http(method, path, query), 16);
        host.events
            .send(InboundEvent::HttpRequest { body: Bytes::copy_from_slice(body.as_bytes()), more_body: false })
            .await
            .unwrap();
        app.dispatch(conn).await.unwrap();

        let events = drain(&mut host);
        assert_eq!(events.len(), 2, "expected start + body, got {events:?}");
        let (status, headers) = match &events[0] {
            OutboundEvent::ResponseStart { status, headers } => (*status, headers.clone()),
            other => panic!("unexpected event: {other:?}"),
        };
        let body = match &events[1] {
            OutboundEvent::ResponseBody { body, more_body: false } => String::from_utf8(body.to_vec()).unwrap(),
            other => panic!("unexpected event: {other:?}"),
        };
        Reply { status, headers, body }
    }

    async fn get(app: &App, path: &str, query: &str) -> Reply {
        request(app, Method::GET, path, query, "").await
    }

    #[tokio::test]
    async fn test_static_and_function_routes() {
        let mut app = App::new("test");
        app.get("/").send("Hello, World!");
        app.get("/{name}/hello").send("Hello, {name}!");
        app.get("/search").send_fn(|req| {
            let q = req.params().require("q")?;
            Ok(format!("<p>You searched for: {q}</p>"))
        });

        let reply = get(&app, "/", "").await;
        assert_eq!(reply.status, 200);
        assert_eq!(reply.headers, vec![("content-type".to_string(), "text/html".to_string())]);
        assert_eq!(reply.body, "Hello, World!");

        assert_eq!(get(&app, "/ann/hello", "").await.body, "Hello, ann!");
        assert_eq!(get(&app, "/search", "q=rust").await.body, "<p>You searched for: rust</p>");
        assert_eq!(get(&app, "/search", "").await.status, 400);
    }

    #[tokio::test]
    async fn test_static_json_is_sent_verbatim() {
        let mut app = App::new("test");
        app.get("/health").json(r#"{"ok":true}"#);

        let reply = get(&app, "/health", "ok=false").await;
        assert_eq!(reply.status, 200);
        assert_eq!(reply.headers, vec![("content-type".to_string(), "application/json".to_string())]);
        assert_eq!(reply.body, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let mut app = App::new("test");
        app.get("/{name}").send("param {name}");
        app.get("/fixed").send("fixed");
        assert_eq!(get(&app, "/fixed", "").await.body, "param fixed");
    }

    #[tokio::test]
    async fn test_unmatched_is_not_found() {
        let mut app = App::new("test");
        app.post("/items").send("created");

        let reply = get(&app, "/items", "").await;
        assert_eq!(reply.status, 404);
        assert_eq!(reply.headers, vec![("content-type".to_string(), "text/plain".to_string())]);
        assert_eq!(reply.body, "Not Found");

        assert_eq!(request(&app, Method::POST, "/items", "", "").await.body, "created");
    }

    #[tokio::test]
    async fn test_request_body_reaches_handler() {
        let mut app = App::new("test");
        app.post("/echo").send_fn_as(|req| Ok(req.body_text()?.to_uppercase()), "text/plain");
        let reply = request(&app, Method::POST, "/echo", "", "shout").await;
        assert_eq!(reply.body, "SHOUT");
    }

    #[tokio::test]
    async fn test_static_prefix_wins_over_routes() {
        let mut app = App::new("test");
        app.mount_dir("/assets", std::env::temp_dir().join("balboa-app-no-such-dir"));
        app.get("/assets/{file}").send("route");

        let reply = get(&app, "/assets/site.css", "").await;
        assert_eq!(reply.status, 404);
        assert_eq!(reply.body, "File Not Found");
    }

    #[tokio::test]
    async fn test_mount_route_under_parent() {
        let mut app = App::new("test");
        let about = app.get("/").send("about page").finish().unwrap().unwrap();
        let team = app.get("/team").send("team page").finish().unwrap().unwrap();
        app.get("/{name}").send("catch-all");

        app.mount_route("/about", about).unwrap();
        app.mount_route("/about", team).unwrap();

        let templates: Vec<_> = app.routes().into_iter().map(|r| r.template).collect();
        assert_eq!(templates, ["/{name}", "/about", "/about/team"]);
        // The catch-all was registered first and still shadows the mounted page.
        assert_eq!(get(&app, "/about", "").await.body, "catch-all");
        assert_eq!(get(&app, "/about/team", "").await.body, "team page");

        assert!(app.unmount(about));
        assert!(matches!(app.mount_route("/x", about), Err(RouteError::UnknownRoute(_))));
    }

    #[tokio::test]
    async fn test_sse_route_after_http_routes() {
        let mut app = App::new("test");
        app.sse("/numbers").send_fn(|stream: EventStream, _params: ParameterSet| async move {
            stream.send("1").await?;
            stream.send("2").await?;
            Ok::<(), HandlerError>(())
        });

        let (conn, mut host) = Connection::open(Scope::http(Method::POST, "/numbers", ""), 16);
        app.dispatch(conn).await.unwrap();
        let events = drain(&mut host);
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], OutboundEvent::ResponseStart { status: 200, .. }));
        assert_eq!(events[1], OutboundEvent::chunk("data: 1\n\n"));
        assert_eq!(events[2], OutboundEvent::chunk("data: 2\n\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_static_sse_uses_configured_interval() {
        let mut config = AppConfig::default();
        config.streaming.repeat_interval_ms = 250;
        let mut app = App::from_config("test", &config);
        app.sse("/ticker").send("tick");

        let (conn, mut host) = Connection::open(Scope::http(Method::GET, "/ticker", ""), 4);
        let app = std::sync::Arc::new(app);
        let task = tokio::spawn({
            let app = app.clone();
            async move { app.dispatch(conn).await }
        });

        assert!(matches!(host.responses.recv().await, Some(OutboundEvent::ResponseStart { .. })));
        let started = tokio::time::Instant::now();
        host.responses.recv().await.unwrap();
        host.responses.recv().await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(250));

        drop(host);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_websocket_without_route_is_closed() {
        let app = App::new("test");
        let (conn, mut host) = Connection::open(Scope::websocket("/nowhere", ""), 4);
        app.dispatch(conn).await.unwrap();
        assert_eq!(drain(&mut host), vec![OutboundEvent::WebSocketClose]);
    }

    #[tokio::test]
    async fn test_websocket_params_and_registry() {
        let mut app = App::new("test");
        app.ws("/rooms/{room}").send_fn(|mut socket: WebSocket, registry: ConnectionRegistry| async move {
            let room = socket.params().require("room")?.to_string();
            while let Some(message) = socket.next_message().await {
                socket.broadcast(&registry, &format!("[{room}] {message}")).await;
            }
            Ok::<(), HandlerError>(())
        });

        let (conn, mut host) = Connection::open(Scope::websocket("/rooms/lobby", ""), 16);
        host.events.send(InboundEvent::WebSocketConnect).await.unwrap();
        host.events
            .send(InboundEvent::WebSocketReceive { text: "hi".into() })
            .await
            .unwrap();
        host.events.send(InboundEvent::WebSocketDisconnect).await.unwrap();

        app.dispatch(conn).await.unwrap();
        assert_eq!(
            drain(&mut host),
            vec![
                OutboundEvent::WebSocketAccept,
                OutboundEvent::WebSocketSend { text: "[lobby] hi".into() },
            ]
        );
        assert!(app.registry().is_empty());
    }

    #[tokio::test]
    async fn test_websocket_handler_error_propagates() {
        let mut app = App::new("test");
        let id = app
            .ws("/fail")
            .send_fn(|_socket: WebSocket, _registry: ConnectionRegistry| async move {
                Err::<(), _>(HandlerError::failed("boom"))
            })
            .finish()
            .unwrap()
            .unwrap();

        let (conn, _host) = Connection::open(Scope::websocket("/fail", ""), 4);
        match app.dispatch(conn).await {
            Err(DispatchError::Handler { route, .. }) => assert_eq!(route, id),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
