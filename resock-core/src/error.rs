//! Error types for resock
//!
//! Only two operations ever return an error to the caller: building a
//! transport and sending on it. Everything that goes wrong on the socket
//! afterwards (connect errors, dropped connections, undecodable frames) is
//! reported through transport events and logs instead.
//!
//! # Error Categories
//!
//! - **Configuration errors**: `Config` - missing or malformed URL, bad headers,
//!   no Tokio runtime available
//! - **Lifecycle errors**: `TransportClosed`, `ConnectionClosed`
//! - **Transport errors**: `WebSocket`, `Io`
//! - **Processing errors**: `Serialization`, `InvalidMessage`, `Internal`
//!
//! # Examples
//!
//! ```rust
//! use resock_core::Error;
//!
//! let error = Error::TransportClosed;
//! assert_eq!(error.to_string(), "transport closed");
//! assert!(error.is_closed());
//! ```

use thiserror::Error;

/// Result type for resock operations
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level error type for resock operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Invalid or missing configuration
    ///
    /// Raised while creating a socket: an empty URL, a URL that does not
    /// parse or uses an unsupported scheme, an invalid handshake header, or
    /// a missing Tokio runtime.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The transport was closed by its owner
    ///
    /// Returned by `send` once `close()` has been called. A closed transport
    /// never reopens.
    #[error("transport closed")]
    TransportClosed,

    /// There is no live socket to write to
    ///
    /// Happens after the transport gave up reconnecting.
    #[error("Connection closed")]
    ConnectionClosed,

    /// WebSocket transport layer error
    ///
    /// Covers handshake failures and writes to a socket whose I/O task has
    /// already stopped.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Input/output error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Inbound text is not a valid signaling message
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error means the transport or its socket is gone
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::TransportClosed | Error::ConnectionClosed)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
