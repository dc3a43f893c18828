//! Framing codec for the hub wire protocol.
//!
//! Outgoing payloads are wrapped in a one-byte start marker (`0x00`) and a
//! one-byte end marker (`0xFD`). The markers are not escaped, so a payload
//! containing either byte is still written verbatim; the hub relies on the
//! JSON structure rather than the markers to find message boundaries.
//!
//! Inbound messages are located by brace matching: the decoder skips to the
//! first `{`, then tracks object depth (ignoring braces inside JSON string
//! literals) until the matching `}` closes the message. Anything before the
//! first `{`, including stray marker bytes, is discarded. A marker byte met
//! inside an open object ends that object as unterminated, so one message
//! with an unbalanced quote or brace cannot swallow the frames after it.
//!
//! # Error Handling
//!
//! The codec reports failures through [`CodecError`]. Oversized, empty or
//! unterminated messages are [`RecoveryPolicy::Drop`] errors: the offending
//! bytes are discarded and decoding may continue on the same buffer.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

pub mod error;
pub mod recovery;

pub use error::{CodecError, EofError, FramingError, ProtocolError};
pub use recovery::RecoveryPolicy;

/// Marker byte written before every outbound payload.
pub const FRAME_START: u8 = 0x00;

/// Marker byte written after every outbound payload.
pub const FRAME_END: u8 = 0xFD;

/// Bytes added to a payload by [`HubCodec`]'s encoder.
pub const FRAME_OVERHEAD: usize = 2;

/// Minimum message length in bytes.
///
/// Lengths passed to [`HubCodec::new`] are clamped to at least this value.
pub const MIN_MESSAGE_LENGTH: usize = 64;

/// Maximum message length in bytes (16 MiB).
///
/// Lengths passed to [`HubCodec::new`] are clamped to at most this value to
/// prevent unbounded buffering of an unterminated message.
pub const MAX_MESSAGE_LENGTH: usize = 16 * 1024 * 1024;

/// Default message length limit (1 MiB).
pub const DEFAULT_MESSAGE_LENGTH: usize = 1024 * 1024;

pub(crate) fn clamp_message_length(value: usize) -> usize {
    value.clamp(MIN_MESSAGE_LENGTH, MAX_MESSAGE_LENGTH)
}

/// Encoder and decoder for the hub's marker-delimited JSON stream.
///
/// # Examples
///
/// ```
/// use bytes::{Bytes, BytesMut};
/// use hubwire::codec::HubCodec;
/// use tokio_util::codec::{Decoder, Encoder};
///
/// let mut codec = HubCodec::default();
/// let mut wire = BytesMut::new();
/// codec
///     .encode(Bytes::from_static(br#"{"sub":"room1"}"#), &mut wire)
///     .expect("encode");
/// assert_eq!(wire.first(), Some(&0x00));
/// assert_eq!(wire.last(), Some(&0xFD));
///
/// let message = codec.decode(&mut wire).expect("decode").expect("complete");
/// assert_eq!(&message[..], br#"{"sub":"room1"}"#);
/// ```
#[derive(Clone, Debug)]
pub struct HubCodec {
    max_message_length: usize,
    scan: Scan,
}

impl HubCodec {
    /// Construct a codec with a maximum message length.
    #[must_use]
    pub fn new(max_message_length: usize) -> Self {
        Self {
            max_message_length: clamp_message_length(max_message_length),
            scan: Scan::default(),
        }
    }

    /// Return the maximum message length accepted by this codec.
    #[must_use]
    pub fn max_message_length(&self) -> usize { self.max_message_length }

    fn oversized(&self, size: usize) -> CodecError {
        CodecError::Framing(FramingError::OversizedFrame {
            size,
            max: self.max_message_length,
        })
    }
}

impl Default for HubCodec {
    fn default() -> Self {
        Self {
            max_message_length: DEFAULT_MESSAGE_LENGTH,
            scan: Scan::default(),
        }
    }
}

/// Progress through the object at the front of the read buffer.
///
/// Kept between [`HubCodec::decode`] calls so a message arriving over many
/// reads is scanned once.
#[derive(Clone, Copy, Debug, Default)]
struct Scan {
    offset: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

/// Outcome of [`Scan::resume`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    /// The object ends before this index.
    Complete(usize),
    /// More bytes are needed.
    Pending,
    /// A marker byte interrupted the object at this index.
    Broken(usize),
}

impl Scan {
    /// Continue scanning the object starting at `buf[0]`, which must be `{`.
    ///
    /// Marker bytes never occur in JSON text, so meeting one means the object
    /// was cut short and the next frame has begun.
    fn resume(&mut self, buf: &[u8]) -> Step {
        for (index, &byte) in buf.iter().enumerate().skip(self.offset) {
            if byte == FRAME_START || byte == FRAME_END {
                *self = Self::default();
                return Step::Broken(index);
            }
            if self.in_string {
                match byte {
                    _ if self.escaped => self.escaped = false,
                    b'\\' => self.escaped = true,
                    b'"' => self.in_string = false,
                    _ => {}
                }
                continue;
            }
            match byte {
                b'"' => self.in_string = true,
                b'{' => self.depth += 1,
                b'}' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        *self = Self::default();
                        return Step::Complete(index + 1);
                    }
                }
                _ => {}
            }
        }
        self.offset = buf.len();
        Step::Pending
    }
}

impl Decoder for HubCodec {
    type Item = Bytes;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.scan.offset == 0 {
            let Some(start) = src.iter().position(|&byte| byte == b'{') else {
                // No message can begin in these bytes.
                src.clear();
                return Ok(None);
            };
            src.advance(start);
        }

        match self.scan.resume(src) {
            Step::Complete(end) if end > self.max_message_length => {
                src.advance(end);
                Err(self.oversized(end))
            }
            Step::Complete(end) => Ok(Some(src.split_to(end).freeze())),
            Step::Broken(size) => {
                src.advance(size);
                Err(CodecError::Framing(FramingError::UnterminatedMessage {
                    size,
                }))
            }
            Step::Pending if src.len() > self.max_message_length => {
                let size = src.len();
                src.clear();
                self.scan = Scan::default();
                Err(self.oversized(size))
            }
            Step::Pending => Ok(None),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let bytes_received = src.len();
        src.clear();
        self.scan = Scan::default();
        Err(CodecError::Eof(EofError::MidMessage { bytes_received }))
    }
}

impl Encoder<Bytes> for HubCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.is_empty() {
            return Err(CodecError::Framing(FramingError::EmptyFrame));
        }
        if item.len() > self.max_message_length {
            return Err(self.oversized(item.len()));
        }
        dst.reserve(item.len() + FRAME_OVERHEAD);
        dst.put_u8(FRAME_START);
        dst.extend_from_slice(&item);
        dst.put_u8(FRAME_END);
        Ok(())
    }
}
