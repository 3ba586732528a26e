//! Server-Sent Event streams.
//!
//! # Responsibilities
//! - Open the stream with event-stream headers
//! - Frame each message as `data: <message>\n\n` on a body chunk
//! - End quietly when the client goes away

use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::handlers::error::HandlerError;
use crate::protocol::{Outbound, OutboundEvent, ProtocolError};
use crate::routing::ParameterSet;

/// Sender side of an open event stream.
#[derive(Debug, Clone)]
pub struct EventStream {
    outbound: Outbound,
}

impl EventStream {
    pub fn new(outbound: Outbound) -> Self {
        Self { outbound }
    }

    /// Send one event as a `data:` frame.
    pub async fn send(&self, message: &str) -> Result<(), ProtocolError> {
        let frame = format!("data: {message}\n\n");
        self.outbound.send(OutboundEvent::chunk(frame)).await
    }

    /// Resolves once the client has gone away.
    pub async fn closed(&self) {
        self.outbound.closed().await
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

pub type StreamFn = Arc<dyn Fn(EventStream, ParameterSet) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// Handler for an SSE route.
#[derive(Clone)]
pub struct StreamHandler {
    func: StreamFn,
}

impl fmt::Debug for StreamHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandler").finish_non_exhaustive()
    }
}

impl StreamHandler {
    pub fn from_fn<F, Fut>(func: F) -> Self
    where
        F: Fn(EventStream, ParameterSet) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |stream, params| Box::pin(func(stream, params))),
        }
    }

    /// Resend `payload` every `interval` until the client disconnects.
    pub fn repeat(payload: impl Into<String>, interval: Duration) -> Self {
        let payload: Arc<str> = Arc::from(payload.into());
        Self::from_fn(move |stream, _params| repeat_forever(stream, payload.clone(), interval))
    }

    /// Send the stream headers, then run the user future.
    pub async fn invoke(&self, params: ParameterSet, outbound: Outbound) -> Result<(), HandlerError> {
        let start = OutboundEvent::ResponseStart {
            status: 200,
            headers: vec![
                ("content-type".to_string(), "text/event-stream".to_string()),
                ("cache-control".to_string(), "no-cache".to_string()),
                ("connection".to_string(), "keep-alive".to_string()),
            ],
        };

        let outcome = match outbound.send(start).await {
            Ok(()) => (self.func)(EventStream::new(outbound), params).await,
            Err(e) => Err(e.into()),
        };

        match outcome {
            Err(e) if e.is_cancellation() => {
                tracing::debug!("Event stream closed by client");
                Ok(())
            }
            other => other,
        }
    }
}

async fn repeat_forever(stream: EventStream, payload: Arc<str>, interval: Duration) -> Result<(), HandlerError> {
    loop {
        stream.send(&payload).await?;
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = stream.closed() => return Err(ProtocolError::Cancelled.into()),
        }
    }
}
