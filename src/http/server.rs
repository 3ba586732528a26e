//! HTTP server setup and host bridging.
//!
//! # Responsibilities
//! - Create the Axum router with a catch-all handler
//! - Wire up middleware (tracing, request ID)
//! - Turn each request into a `Scope` plus event channels
//! - Run `App::dispatch` on its own task and stream the outbound events
//!   back as the HTTP response
//!
//! # Data Flow
//! ```text
//! axum request
//!     → path percent-decoded into the Scope (raw form kept alongside)
//!     → body collected (413 over the limit)
//!     → http.request event → App::dispatch (spawned)
//!     → http.response.start → status + headers
//!     → http.response.body* → streamed response body
//! ```

use axum::{
    body::{Body, Bytes},
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        State,
    },
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use futures_util::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::app::App;
use crate::config::ServerConfig;
use crate::http::websocket;
use crate::lifecycle::Shutdown;
use crate::protocol::{decode_path, Connection, HostChannels, InboundEvent, OutboundEvent, Scope};

/// State shared by every request handler.
#[derive(Clone)]
pub(crate) struct ServerState {
    pub app: Arc<App>,
    pub max_body_bytes: usize,
    pub channel_capacity: usize,
    pub shutdown: Shutdown,
}

impl ServerState {
    /// Open a connection for `scope` and run the dispatcher on it.
    pub fn spawn_dispatch(&self, scope: Scope) -> HostChannels {
        let (connection, host) = Connection::open(scope, self.channel_capacity);
        let app = Arc::clone(&self.app);
        tokio::spawn(async move {
            if let Err(e) = app.dispatch(connection).await {
                tracing::error!(error = %e, "Dispatch failed");
            }
        });
        host
    }
}

/// HTTP host for a Balboa application.
pub struct HttpServer {
    router: Router,
    shutdown: Shutdown,
}

impl HttpServer {
    pub fn new(app: Arc<App>, config: &ServerConfig, shutdown: Shutdown) -> Self {
        let state = ServerState {
            app,
            max_body_bytes: config.max_body_bytes,
            channel_capacity: config.channel_capacity.max(1),
            shutdown: shutdown.clone(),
        };
        Self {
            router: Self::build_router(state),
            shutdown,
        }
    }

    /// Every method and path goes to the same handler; routing happens in `App`.
    fn build_router(state: ServerState) -> Router {
        Router::new()
            .route("/", any(entry))
            .route("/{*path}", any(entry))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The configured router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until the shutdown handle fires.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let mut stop = self.shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn entry(
    State(state): State<ServerState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    body: Body,
) -> Response {
    let query = uri.query().unwrap_or("");
    let header_pairs: Vec<(String, String)> = headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect();

    if let Ok(upgrade) = upgrade {
        let mut scope = Scope::websocket(decode_path(uri.path()), query).with_raw_path(uri.path());
        scope.headers = header_pairs;
        return websocket::accept(&state, scope, upgrade).await;
    }

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(path = %uri.path(), error = %e, limit = state.max_body_bytes, "Request body rejected");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response();
        }
    };

    let mut scope = Scope::http(method, decode_path(uri.path()), query).with_raw_path(uri.path());
    scope.headers = header_pairs;

    let mut host = state.spawn_dispatch(scope);
    // Capacity is at least one, so this never waits.
    let _ = host
        .events
        .send(InboundEvent::HttpRequest { body, more_body: false })
        .await;

    let (status, headers) = match host.responses.recv().await {
        Some(OutboundEvent::ResponseStart { status, headers }) => (status, headers),
        Some(other) => {
            tracing::error!(event = other.event_type(), "Expected http.response.start");
            return internal_error();
        }
        None => {
            tracing::error!(path = %uri.path(), "Application ended without a response");
            return internal_error();
        }
    };

    let mut response = Response::builder().status(status);
    for (name, value) in headers {
        response = response.header(name, value);
    }

    let body = Body::from_stream(body_stream(host, state.shutdown.subscribe()));
    response.body(body).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid response head");
        internal_error()
    })
}

/// Body chunks from `http.response.body` events until `more_body` is false,
/// the application finishes, or the server shuts down.
fn body_stream(
    host: HostChannels,
    shutdown: broadcast::Receiver<()>,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    futures_util::stream::unfold(Some((host, shutdown)), |state| async move {
        let (mut host, mut shutdown) = state?;
        tokio::select! {
            event = host.responses.recv() => match event? {
                OutboundEvent::ResponseBody { body, more_body } => {
                    let next = more_body.then_some((host, shutdown));
                    Some((Ok(body), next))
                }
                other => {
                    tracing::warn!(event = other.event_type(), "Ignoring event after response start");
                    Some((Ok(Bytes::new()), Some((host, shutdown))))
                }
            },
            // Only a real trigger ends the body; a closed channel means every
            // `Shutdown` handle is gone, not that shutdown was requested.
            Ok(()) = shutdown.recv() => None,
        }
    })
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}
