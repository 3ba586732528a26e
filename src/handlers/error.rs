//! Errors produced by user handlers.

use crate::protocol::ProtocolError;
use crate::template::TemplateError;

/// Error returned from a route handler.
///
/// For HTTP routes the dispatcher turns it into a `text/plain` response with
/// [`HandlerError::status`]. For stream and socket routes it ends the
/// connection; cancellation is not reported as a failure.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("missing parameter `{0}`")]
    MissingParameter(String),
    #[error("invalid value `{value}` for parameter `{name}`: {reason}")]
    InvalidParameter { name: String, value: String, reason: String },
    #[error("request body is not valid UTF-8")]
    InvalidBody,
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }

    /// HTTP status used when this error ends an HTTP route.
    pub fn status(&self) -> u16 {
        match self {
            HandlerError::MissingParameter(_)
            | HandlerError::InvalidParameter { .. }
            | HandlerError::InvalidBody => 400,
            _ => 500,
        }
    }

    /// Body text shown to the client. Server-side failures stay opaque.
    pub fn public_message(&self) -> String {
        if self.status() == 400 {
            self.to_string()
        } else {
            "Internal Server Error".to_string()
        }
    }

    /// The host went away; a normal end for streams and sessions.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, HandlerError::Protocol(ProtocolError::Cancelled))
    }
}
