//! Error types for ptymux-core.

use thiserror::Error;

/// Main error type for ptymux operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from underlying system calls.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol violation or malformed frame.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Codec error during encoding/decoding.
    #[error("codec error: {message}")]
    Codec { message: String },

    /// Session not found for given ID.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Operation on a session that has been closed.
    #[error("session closed")]
    SessionClosed,

    /// Endpoint rejected the connect handshake.
    #[error("handshake failed: {message}")]
    Handshake { message: String },

    /// Connection was closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Invalid state transition.
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// Operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// Transport layer error.
    #[error("transport error: {message}")]
    Transport { message: String },
}

impl Error {
    /// Returns true if this error is transient and reconnection may help.
    ///
    /// Transient errors include network/transport failures where the
    /// remote PTY session may still be alive and reconnection could
    /// succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Transport { .. }
                | Error::ConnectionClosed
                | Error::Timeout
                | Error::Io(_)
        )
    }

    /// Returns true if this error is fatal and reconnection won't help.
    ///
    /// Fatal errors mean the endpoint rejected us or the session is
    /// gone on our side.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Handshake { .. }
                | Error::SessionClosed
                | Error::SessionNotFound(_)
                | Error::Protocol { .. }
        )
    }
}

/// Convenience result type for ptymux operations.
pub type Result<T> = std::result::Result<T, Error>;
