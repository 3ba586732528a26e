//! HTTP response handlers.
//!
//! # Responsibilities
//! - Collect the request body from `http.request` events
//! - Resolve a static or function handler to a body string
//! - Emit exactly one `http.response.start` followed by one full body
//!
//! # Design Decisions
//! - Bodies are buffered, never chunked
//! - Handler errors become `text/plain` responses (400 for bad input, 500 otherwise)

use axum::body::Bytes;
use axum::http::Method;
use std::fmt;
use std::sync::Arc;

use crate::handlers::error::HandlerError;
use crate::protocol::{Inbound, InboundEvent, Outbound, OutboundEvent, ProtocolError, Scope};
use crate::routing::ParameterSet;
use crate::template;

/// What a function handler sees of the request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    params: ParameterSet,
    body: Bytes,
}

impl Request {
    pub fn new(scope: &Scope, params: ParameterSet, body: Bytes) -> Self {
        Self {
            method: scope.method.clone(),
            path: scope.path.clone(),
            headers: scope.headers.clone(),
            params,
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn body_text(&self) -> Result<&str, HandlerError> {
        std::str::from_utf8(&self.body).map_err(|_| HandlerError::InvalidBody)
    }
}

pub type ResponseFn = Arc<dyn Fn(&Request) -> Result<String, HandlerError> + Send + Sync>;

/// Handler for an HTTP route.
#[derive(Clone)]
pub enum ResponseHandler {
    /// Fixed payload. When `templated`, `{name}` placeholders are substituted
    /// from the request parameters; otherwise it is sent verbatim.
    Static {
        payload: String,
        content_type: String,
        templated: bool,
    },
    Function { func: ResponseFn, content_type: String },
}

impl fmt::Debug for ResponseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseHandler::Static {
                payload,
                content_type,
                templated,
            } => f
                .debug_struct("Static")
                .field("payload", payload)
                .field("content_type", content_type)
                .field("templated", templated)
                .finish(),
            ResponseHandler::Function { content_type, .. } => f
                .debug_struct("Function")
                .field("content_type", content_type)
                .finish_non_exhaustive(),
        }
    }
}

impl ResponseHandler {
    /// Template payload, filled from the request parameters on every request.
    pub fn fixed(payload: impl Into<String>, content_type: &str) -> Self {
        ResponseHandler::Static {
            payload: payload.into(),
            content_type: content_type.to_string(),
            templated: true,
        }
    }

    /// Payload sent exactly as given; braces need no escaping.
    pub fn verbatim(payload: impl Into<String>, content_type: &str) -> Self {
        ResponseHandler::Static {
            payload: payload.into(),
            content_type: content_type.to_string(),
            templated: false,
        }
    }

    pub fn from_fn<F>(func: F, content_type: &str) -> Self
    where
        F: Fn(&Request) -> Result<String, HandlerError> + Send + Sync + 'static,
    {
        ResponseHandler::Function {
            func: Arc::new(func),
            content_type: content_type.to_string(),
        }
    }

    pub fn content_type(&self) -> &str {
        match self {
            ResponseHandler::Static { content_type, .. } | ResponseHandler::Function { content_type, .. } => {
                content_type
            }
        }
    }

    /// Produce the response body for `request`.
    pub fn respond(&self, request: &Request) -> Result<String, HandlerError> {
        match self {
            ResponseHandler::Static {
                payload,
                templated: true,
                ..
            } => Ok(template::substitute(payload, request.params())?),
            ResponseHandler::Static { payload, .. } => Ok(payload.clone()),
            ResponseHandler::Function { func, .. } => func(request),
        }
    }

    /// Drive the two-event response sequence. Returns the status sent.
    pub async fn invoke(&self, request: &Request, outbound: &Outbound) -> Result<u16, ProtocolError> {
        let (status, content_type, body) = match self.respond(request) {
            Ok(body) => (200, self.content_type(), body),
            Err(error) => {
                tracing::warn!(
                    path = %request.path(),
                    status = error.status(),
                    error = %error,
                    "Handler failed"
                );
                (error.status(), "text/plain", error.public_message())
            }
        };

        outbound.send(OutboundEvent::start(status, content_type)).await?;
        outbound.send(OutboundEvent::body(body)).await?;
        Ok(status)
    }
}

/// Gather the request body from `http.request` events.
///
/// A host that closes its event channel without sending a body yields an
/// empty body; an explicit `http.disconnect` cancels the request.
pub async fn read_body(inbound: &mut Inbound) -> Result<Bytes, ProtocolError> {
    let mut chunks: Vec<Bytes> = Vec::new();
    loop {
        match inbound.receive().await {
            Ok(InboundEvent::HttpRequest { body, more_body }) => {
                chunks.push(body);
                if !more_body {
                    break;
                }
            }
            Ok(InboundEvent::HttpDisconnect) => return Err(ProtocolError::Cancelled),
            Ok(other) => {
                tracing::trace!(event = other.event_type(), "Ignoring event while reading body");
            }
            Err(_) => break,
        }
    }

    Ok(match chunks.len() {
        0 => Bytes::new(),
        1 => chunks.remove(0),
        _ => Bytes::from(chunks.concat()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Connection, HostChannels};

    fn request(query: &str) -> Request {
        let scope = Scope::http(Method::GET, "/", query);
        let params = ParameterSet::resolve(&scope.path_params, &scope.query_string);
        Request::new(&scope, params, Bytes::new())
    }

    fn collect(host: &mut HostChannels) -> Vec<OutboundEvent> {
        let mut events = Vec::new();
        while let Ok(event) = host.responses.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn static_response_emits_two_events() {
        let (conn, mut host) = Connection::open(Scope::http(Method::GET, "/", ""), 8);
        let handler = ResponseHandler::fixed("Hello, World!", "text/plain");

        let status = handler.invoke(&request(""), &conn.outbound).await.unwrap();
        assert_eq!(status, 200);
        assert_eq!(
            collect(&mut host),
            vec![
                OutboundEvent::start(200, "text/plain"),
                OutboundEvent::body("Hello, World!"),
            ]
        );
    }

    #[test]
    fn static_payload_substitutes_params() {
        let handler = ResponseHandler::fixed("Hello, {name}!", "text/html");
        assert_eq!(handler.respond(&request("name=Ann")).unwrap(), "Hello, Ann!");
        assert!(matches!(handler.respond(&request("")), Err(HandlerError::Template(_))));
    }

    #[test]
    fn verbatim_payload_keeps_braces() {
        let handler = ResponseHandler::verbatim(r#"{"ok":true}"#, "application/json");
        assert_eq!(handler.respond(&request("")).unwrap(), r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn handler_error_becomes_plain_response() {
        let (conn, mut host) = Connection::open(Scope::http(Method::GET, "/", ""), 8);
        let handler = ResponseHandler::from_fn(
            |req| {
                let n: i64 = req.params().parse("n")?;
                Ok((n * 2).to_string())
            },
            "text/html",
        );

        let status = handler.invoke(&request("n=abc"), &conn.outbound).await.unwrap();
        assert_eq!(status, 400);
        let events = collect(&mut host);
        assert_eq!(events[0], OutboundEvent::start(400, "text/plain"));
        assert!(matches!(&events[1], OutboundEvent::ResponseBody { body, more_body: false }
            if body.starts_with(b"invalid value `abc`")));
    }

    #[tokio::test]
    async fn body_is_reassembled_from_chunks() {
        let (mut conn, host) = Connection::open(Scope::http(Method::POST, "/", ""), 8);
        host.events
            .send(InboundEvent::HttpRequest { body: Bytes::from_static(b"hello "), more_body: true })
            .await
            .unwrap();
        host.events
            .send(InboundEvent::HttpRequest { body: Bytes::from_static(b"world"), more_body: false })
            .await
            .unwrap();

        assert_eq!(read_body(&mut conn.inbound).await.unwrap(), Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn missing_body_is_empty() {
        let (mut conn, host) = Connection::open(Scope::http(Method::GET, "/", ""), 8);
        drop(host.events);
        assert!(read_body(&mut conn.inbound).await.unwrap().is_empty());
    }
}
