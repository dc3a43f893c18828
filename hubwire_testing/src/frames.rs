//! Helpers for building and taking apart marker-delimited byte streams.

use hubwire::codec::{FRAME_END, FRAME_START};

/// Wrap `payload` in the start and end markers.
///
/// ```rust
/// assert_eq!(hubwire_testing::frame(b"{}"), b"\x00{}\xFD");
/// ```
#[must_use]
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 2);
    out.push(FRAME_START);
    out.extend_from_slice(payload);
    out.push(FRAME_END);
    out
}

/// Split a captured byte stream into frame payloads.
///
/// Each returned payload excludes its markers. Trailing bytes without an end
/// marker are ignored.
///
/// # Panics
///
/// Panics if a frame does not begin with the start marker.
#[must_use]
pub fn split_frames(bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    let mut rest = bytes;
    while let Some(end) = rest.iter().position(|&b| b == FRAME_END) {
        let (head, tail) = rest.split_at(end);
        assert_eq!(
            head.first(),
            Some(&FRAME_START),
            "frame must begin with the start marker"
        );
        frames.push(head[1..].to_vec());
        rest = &tail[1..];
    }
    frames
}

/// Cut `bytes` into pieces of at most `size` bytes.
///
/// Used to deliver frames across several socket writes.
///
/// # Panics
///
/// Panics if `size` is zero.
#[must_use]
pub fn chunk(bytes: &[u8], size: usize) -> Vec<Vec<u8>> {
    bytes.chunks(size).map(<[u8]>::to_vec).collect()
}
