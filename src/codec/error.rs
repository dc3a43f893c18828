//! Error types for the codec layer.
//!
//! This module provides a structured error taxonomy that distinguishes between
//! framing errors (message boundary issues in the byte stream), protocol errors
//! (an extracted message that is not a valid envelope), I/O errors, and EOF
//! conditions.
//!
//! # Error Categories
//!
//! - [`FramingError`]: Stream-level issues (oversized, empty or unterminated messages).
//! - [`ProtocolError`]: A complete message was extracted but is not valid JSON or lacks the `id` /
//!   `doc` envelope fields.
//! - [`EofError`]: A peer that vanished mid-message.
//! - [`CodecError`]: Top-level enum wrapping all categories plus I/O errors.
//!
//! # Recovery Policies
//!
//! Each error has a default recovery policy accessible via
//! [`CodecError::default_recovery_policy`]:
//!
//! - [`RecoveryPolicy::Drop`]: Discard the offending message and keep reading.
//! - [`RecoveryPolicy::Disconnect`]: Tear the connection down.

use std::io;

use thiserror::Error;

use super::recovery::RecoveryPolicy;

/// Framing-level errors occurring while locating message boundaries.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// A message exceeded the configured maximum length.
    ///
    /// On the decode side this is raised for an unterminated message whose
    /// buffered prefix already exceeds the limit.
    #[error("message exceeds max length: {size} > {max}")]
    OversizedFrame {
        /// Bytes buffered (decode) or payload size (encode).
        size: usize,
        /// Maximum allowed message size.
        max: usize,
    },

    /// Zero-length payload where a JSON document is required.
    #[error("empty frame not permitted")]
    EmptyFrame,

    /// A marker byte arrived before the open message was closed.
    #[error("unterminated message: {size} bytes before the next marker")]
    UnterminatedMessage {
        /// Bytes of the partial message that were discarded.
        size: usize,
    },
}

/// Protocol-level errors occurring after a message has been extracted.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The extracted span did not parse as JSON.
    #[error("invalid JSON message: {reason}")]
    InvalidJson {
        /// Parser diagnostic.
        reason: String,
    },

    /// A required envelope field is absent.
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// An envelope field is present but has the wrong type.
    #[error("invalid field {field}: expected {expected}")]
    InvalidField {
        /// Name of the malformed field.
        field: &'static str,
        /// Description of the expected type.
        expected: &'static str,
    },
}

/// Premature end-of-stream.
///
/// A close at a message boundary is not an error; the decoder returns
/// `Ok(None)` for it.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum EofError {
    /// The peer closed the stream while a message was still incomplete.
    #[error("premature EOF: {bytes_received} bytes of an unterminated message buffered")]
    MidMessage {
        /// Bytes of the unterminated message received before EOF.
        bytes_received: usize,
    },
}

/// Top-level codec error taxonomy.
///
/// # Examples
///
/// ```
/// use hubwire::codec::{CodecError, FramingError, RecoveryPolicy};
///
/// let err = CodecError::Framing(FramingError::OversizedFrame {
///     size: 2000,
///     max: 1024,
/// });
///
/// assert_eq!(err.default_recovery_policy(), RecoveryPolicy::Drop);
/// assert!(!err.should_disconnect());
/// ```
#[derive(Debug, Error)]
pub enum CodecError {
    /// Framing layer error.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// Envelope or JSON error in an extracted message.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Transport layer I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// End-of-stream handling.
    #[error("EOF: {0}")]
    Eof(#[from] EofError),
}

impl CodecError {
    /// Returns the recommended recovery policy for this error.
    ///
    /// | Error Type | Policy |
    /// |------------|--------|
    /// | All `Framing` errors | `Drop` |
    /// | All `Protocol` errors | `Drop` |
    /// | All `Io` errors | `Disconnect` |
    /// | All `Eof` errors | `Disconnect` |
    #[must_use]
    pub fn default_recovery_policy(&self) -> RecoveryPolicy {
        match self {
            Self::Framing(_) | Self::Protocol(_) => RecoveryPolicy::Drop,
            Self::Io(_) | Self::Eof(_) => RecoveryPolicy::Disconnect,
        }
    }

    /// Returns true if the connection should be terminated.
    #[must_use]
    pub fn should_disconnect(&self) -> bool {
        self.default_recovery_policy() == RecoveryPolicy::Disconnect
    }

    /// Returns the error category as a string for logging and metrics.
    ///
    /// One of: `"framing"`, `"protocol"`, `"io"`, or `"eof"`.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Framing(_) => "framing",
            Self::Protocol(_) => "protocol",
            Self::Io(_) => "io",
            Self::Eof(_) => "eof",
        }
    }
}

impl From<CodecError> for io::Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => e,
            CodecError::Framing(e) => io::Error::new(io::ErrorKind::InvalidData, e),
            CodecError::Protocol(e) => io::Error::new(io::ErrorKind::InvalidData, e),
            CodecError::Eof(e) => io::Error::new(io::ErrorKind::UnexpectedEof, e),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
