//! Real-time and cache error types.

use callboard_api::ApiError;
use callboard_core::errors::{Classify, ErrorCategory};

/// Failures of the event-stream transport.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Could not open the socket.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The peer closed the stream.
    #[error("connection closed")]
    Closed,

    /// The server did not answer the handshake in time.
    #[error("handshake timed out")]
    HandshakeTimeout,

    /// The server rejected the handshake credential.
    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),

    /// Any other socket failure.
    #[error("{0}")]
    Other(String),
}

impl Classify for TransportError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::HandshakeRejected(_) => ErrorCategory::Authentication,
            _ => ErrorCategory::Network,
        }
    }
}

/// A frame that could not be turned into an event.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Not a `{event, data}` JSON object.
    #[error("malformed frame: {0}")]
    Frame(String),

    /// Known event name with a payload of the wrong shape.
    #[error("malformed {event} payload: {reason}")]
    Payload {
        /// Event name.
        event: String,
        /// Decoder message.
        reason: String,
    },
}

impl Classify for ProtocolError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }
}

/// Errors surfaced by store operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The REST call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The entity is not in the cache.
    #[error("{kind} {id} not found")]
    NotFound {
        /// `call` or `conversation`.
        kind: &'static str,
        /// Requested id.
        id: String,
    },
}

impl Classify for SyncError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Api(e) => e.category(),
            Self::NotFound { .. } => ErrorCategory::BusinessRule,
        }
    }
}
