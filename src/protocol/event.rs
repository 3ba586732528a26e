//! Scope and event records exchanged with the host.

use axum::body::Bytes;
use axum::http::Method;
use std::collections::HashMap;

/// Named captures extracted from a matched route template.
pub type PathParams = HashMap<String, String>;

/// Connection class announced by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Http,
    WebSocket,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Http => "http",
            ScopeKind::WebSocket => "websocket",
        }
    }
}

/// Per-connection metadata record supplied by the host.
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub method: Method,
    /// Percent-decoded request path. Routes and static files match against this.
    pub path: String,
    /// Path exactly as it appeared on the request line.
    pub raw_path: String,
    /// Raw query string without the leading `?`.
    pub query_string: String,
    pub headers: Vec<(String, String)>,
    /// Filled in by the dispatcher once a route matches.
    pub path_params: PathParams,
}

impl Scope {
    /// Scope for a plain HTTP request.
    pub fn http(method: Method, path: impl Into<String>, query_string: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            kind: ScopeKind::Http,
            method,
            raw_path: path.clone(),
            path,
            query_string: query_string.into(),
            headers: Vec::new(),
            path_params: PathParams::new(),
        }
    }

    /// Scope for a WebSocket connection. Upgrades always arrive as GET.
    pub fn websocket(path: impl Into<String>, query_string: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            kind: ScopeKind::WebSocket,
            method: Method::GET,
            raw_path: path.clone(),
            path,
            query_string: query_string.into(),
            headers: Vec::new(),
            path_params: PathParams::new(),
        }
    }

    /// Record the undecoded form of `path`.
    pub fn with_raw_path(mut self, raw_path: impl Into<String>) -> Self {
        self.raw_path = raw_path.into();
        self
    }

    /// Builder-style header append.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Percent-decode a request path. Byte sequences that are not UTF-8 after
/// decoding are replaced with U+FFFD.
pub fn decode_path(raw: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
}

/// Events the host delivers to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// `http.request`: a chunk of the request body.
    HttpRequest { body: Bytes, more_body: bool },
    /// `http.disconnect`
    HttpDisconnect,
    /// `websocket.connect`
    WebSocketConnect,
    /// `websocket.receive`
    WebSocketReceive { text: String },
    /// `websocket.disconnect`
    WebSocketDisconnect,
}

impl InboundEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            InboundEvent::HttpRequest { .. } => "http.request",
            InboundEvent::HttpDisconnect => "http.disconnect",
            InboundEvent::WebSocketConnect => "websocket.connect",
            InboundEvent::WebSocketReceive { .. } => "websocket.receive",
            InboundEvent::WebSocketDisconnect => "websocket.disconnect",
        }
    }
}

/// Events the application emits back to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    /// `http.response.start`
    ResponseStart {
        status: u16,
        headers: Vec<(String, String)>,
    },
    /// `http.response.body`
    ResponseBody { body: Bytes, more_body: bool },
    /// `websocket.accept`
    WebSocketAccept,
    /// `websocket.send`
    WebSocketSend { text: String },
    /// `websocket.close`
    WebSocketClose,
}

impl OutboundEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            OutboundEvent::ResponseStart { .. } => "http.response.start",
            OutboundEvent::ResponseBody { .. } => "http.response.body",
            OutboundEvent::WebSocketAccept => "websocket.accept",
            OutboundEvent::WebSocketSend { .. } => "websocket.send",
            OutboundEvent::WebSocketClose => "websocket.close",
        }
    }

    /// Response start with a single `content-type` header.
    pub fn start(status: u16, content_type: &str) -> Self {
        OutboundEvent::ResponseStart {
            status,
            headers: vec![("content-type".to_string(), content_type.to_string())],
        }
    }

    /// Final (non-chunked) response body.
    pub fn body(body: impl Into<Bytes>) -> Self {
        OutboundEvent::ResponseBody {
            body: body.into(),
            more_body: false,
        }
    }

    /// Body chunk with more to follow.
    pub fn chunk(body: impl Into<Bytes>) -> Self {
        OutboundEvent::ResponseBody {
            body: body.into(),
            more_body: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let scope = Scope::http(Method::GET, "/", "").with_header("Content-Type", "text/plain");
        assert_eq!(scope.header("content-type"), Some("text/plain"));
        assert_eq!(scope.header("accept"), None);
    }

    #[test]
    fn decode_path_handles_escapes() {
        assert_eq!(decode_path("/hello/John%20Doe"), "/hello/John Doe");
        assert_eq!(decode_path("/caf%C3%A9"), "/café");
        assert_eq!(decode_path("/a+b/plain"), "/a+b/plain");
        assert_eq!(decode_path("/bad/%FF"), "/bad/\u{FFFD}");
    }

    #[test]
    fn raw_path_defaults_to_path() {
        let scope = Scope::http(Method::GET, "/a b", "");
        assert_eq!(scope.raw_path, "/a b");
        let scope = Scope::http(Method::GET, decode_path("/a%20b"), "").with_raw_path("/a%20b");
        assert_eq!((scope.path.as_str(), scope.raw_path.as_str()), ("/a b", "/a%20b"));
    }

    #[test]
    fn event_type_names() {
        assert_eq!(OutboundEvent::start(200, "text/html").event_type(), "http.response.start");
        assert_eq!(OutboundEvent::chunk("x").event_type(), "http.response.body");
        assert_eq!(InboundEvent::WebSocketDisconnect.event_type(), "websocket.disconnect");
    }
}
