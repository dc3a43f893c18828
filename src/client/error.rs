//! Error types for hub client operations.

use std::io;

use crate::codec::CodecError;

/// Errors returned directly by [`HubClient`](super::HubClient) calls.
///
/// Connection-level failures that happen in the background (connect
/// failures, lost sockets, malformed inbound messages) are reported as
/// [`Event`](crate::event::Event)s instead.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport error while writing a frame.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    /// A filter or document could not be serialized to JSON.
    #[error("failed to serialize message")]
    Serialize(#[source] serde_json::Error),
    /// The payload could not be framed.
    #[error("failed to encode frame: {0}")]
    Codec(#[from] CodecError),
    /// The call requires a live connection.
    #[error("not connected to a hub")]
    NotConnected,
    /// The socket closed before or during the write.
    #[error("connection closed")]
    Disconnected,
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self { Self::Serialize(err) }
}
