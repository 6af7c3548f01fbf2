use thiserror::Error;

use crate::session::ConnectionState;

/// Failures of the underlying bidirectional channel
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no credential configured for the live session")]
    MissingCredential,

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("failed to send: {0}")]
    Send(String),

    #[error("channel is not open")]
    NotOpen,

    #[error("socket error: {0}")]
    Socket(String),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failures surfaced by the session adapter
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is already {0}")]
    AlreadyActive(ConnectionState),

    #[error("connection attempt was cancelled by a disconnect")]
    Cancelled,

    #[error(transparent)]
    Transport(#[from] TransportError),
}
