//! Error types for globe-stream.

use thiserror::Error;

/// Result type for stream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised inside the stream client.
///
/// None of these cross the public surface of [`crate::StreamClient`]; they
/// are logged and fed into the reconnect policy.
#[derive(Debug, Error)]
pub enum Error {
    /// WebSocket handshake or transport failure
    #[error("connection error: {0}")]
    Connection(#[from] tokio_tungstenite::tungstenite::Error),

    /// Inbound frame was not valid JSON or had an unexpected shape
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Remote closed the connection
    #[error("connection closed by remote")]
    Closed,
}
