//! Shared error type across peerline crates.

use std::time::Duration;

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, PeerlineError>;

/// Unified error type used by the codec and the transport stack.
///
/// All variants are cloneable so the connection worker can record one close
/// reason and hand it to every caller still blocked on that connection.
#[derive(Debug, Clone, Error)]
pub enum PeerlineError {
    /// No socket could be established to the server.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),
    /// The socket dropped mid-session (EOF, reset, or local close).
    #[error("connection closed: {0}")]
    ConnectionClosed(String),
    /// No reply arrived within the caller's deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// A line or payload could not be decoded into an envelope.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
    /// A well-formed reply with `status == "error"`. Not a transport fault.
    #[error("application error: {0}")]
    Application(String),
    /// The installed strategy does not support the requested operation.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// Client configuration failed to parse or validate.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl PeerlineError {
    /// Stable code string for logs and assertions.
    pub fn code(&self) -> &'static str {
        match self {
            PeerlineError::ConnectionRefused(_) => "CONNECTION_REFUSED",
            PeerlineError::ConnectionClosed(_) => "CONNECTION_CLOSED",
            PeerlineError::Timeout(_) => "TIMEOUT",
            PeerlineError::MalformedEnvelope(_) => "MALFORMED_ENVELOPE",
            PeerlineError::Application(_) => "APPLICATION_ERROR",
            PeerlineError::Unsupported(_) => "UNSUPPORTED",
            PeerlineError::InvalidConfig(_) => "INVALID_CONFIG",
            PeerlineError::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the connection this error came from is beyond recovery.
    ///
    /// `Timeout` is not terminal: the request is abandoned but the socket may
    /// still be healthy.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PeerlineError::ConnectionRefused(_) | PeerlineError::ConnectionClosed(_)
        )
    }
}
