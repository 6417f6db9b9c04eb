//! Wire framing codec: length-prefixed JSON over datagram sockets (spec §4.1).
//!
//! Each frame is a 4-byte big-endian length prefix followed by that many
//! bytes of UTF-8 JSON. A single `SOCK_DGRAM` datagram may carry more than
//! one frame back to back (spec §4.1 "extract all complete frames from a
//! buffer"); [`extract_all`] pulls every complete frame out of a buffer and
//! reports the leftover tail.

use dgipc_core::{Request, Response};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Size of the length prefix, in bytes.
pub const PREFIX_LEN: usize = 4;

/// Default maximum frame size (10 MiB), matching the datagram socket's
/// practical upper bound before fragmentation costs dominate.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Framing-layer failure (spec §4.1, §6 `MessageFramingError`).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// Buffer shorter than the 4-byte length prefix.
    #[error("buffer too short for a length prefix: {len} bytes")]
    TruncatedPrefix {
        /// Bytes available.
        len: usize,
    },

    /// The declared length exceeds `max_frame_size`.
    #[error("declared frame length {declared} exceeds max frame size {max}")]
    FrameTooLarge {
        /// Length the prefix declared.
        declared: usize,
        /// Configured ceiling.
        max: usize,
    },

    /// Buffer shorter than the declared frame body.
    #[error("buffer has {available} bytes, frame declares {declared}")]
    TruncatedBody {
        /// Bytes available after the prefix.
        available: usize,
        /// Length the prefix declared.
        declared: usize,
    },

    /// The frame body was not valid UTF-8 JSON of the expected shape.
    #[error("malformed frame body: {0}")]
    Malformed(String),
}

/// Whether a frame's JSON body is a bare value ("direct" mode) or is itself
/// wrapped in an envelope understood only at a higher layer. Both modes
/// share the same length-prefix discipline; "direct" mode is the default
/// used by [`encode`]/[`decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameMode {
    /// The frame body is the JSON-encoded value itself.
    #[default]
    Direct,
    /// The frame body is pre-serialized bytes supplied by the caller,
    /// passed through unmodified (used for hand-rolled envelopes in tests).
    Raw,
}

/// Encodes a value as a single length-prefixed frame.
///
/// # Errors
///
/// Returns [`FramingError::FrameTooLarge`] if the serialized body exceeds
/// `max_frame_size`, and propagates JSON serialization failures via
/// [`FramingError::Malformed`].
pub fn encode<T: Serialize>(value: &T, max_frame_size: usize) -> Result<Vec<u8>, FramingError> {
    let body = serde_json::to_vec(value).map_err(|e| FramingError::Malformed(e.to_string()))?;
    encode_raw(&body, max_frame_size)
}

/// Encodes a pre-serialized body as a single length-prefixed frame.
///
/// # Errors
///
/// Returns [`FramingError::FrameTooLarge`] if `body` exceeds `max_frame_size`.
pub fn encode_raw(body: &[u8], max_frame_size: usize) -> Result<Vec<u8>, FramingError> {
    if body.len() > max_frame_size {
        return Err(FramingError::FrameTooLarge {
            declared: body.len(),
            max: max_frame_size,
        });
    }
    let mut frame = Vec::with_capacity(PREFIX_LEN + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(body);
    Ok(frame)
}

/// Decodes a single length-prefixed frame, requiring the buffer to contain
/// exactly one complete frame and nothing more.
///
/// # Errors
///
/// See [`FramingError`] variants.
pub fn decode<T: DeserializeOwned>(buf: &[u8], max_frame_size: usize) -> Result<T, FramingError> {
    let (value, rest) = decode_one(buf, max_frame_size)?;
    if !rest.is_empty() {
        return Err(FramingError::Malformed(format!(
            "{} trailing bytes after a single expected frame",
            rest.len()
        )));
    }
    value
}

/// Extracts every complete frame from `buf`, returning the decoded values
/// in order along with any incomplete trailing bytes (spec §4.1).
///
/// A frame that fails to deserialize into `T` is reported as a
/// [`FramingError::Malformed`] entry in the returned `Vec` rather than
/// aborting the whole scan, so one corrupt frame does not hide the
/// well-formed frames around it.
///
/// # Errors
///
/// Returns [`FramingError::TruncatedPrefix`]/[`FramingError::FrameTooLarge`]
/// only when the *first unparsed* bytes look like the start of a frame
/// whose length prefix itself is unreadable; a dangling partial frame
/// shorter than the next prefix is returned as leftover, not an error.
pub fn extract_all<T: DeserializeOwned>(
    buf: &[u8],
    max_frame_size: usize,
) -> Result<(Vec<Result<T, FramingError>>, Vec<u8>), FramingError> {
    let mut frames = Vec::new();
    let mut offset = 0usize;

    while offset < buf.len() {
        let remaining = &buf[offset..];
        if remaining.len() < PREFIX_LEN {
            break;
        }
        let declared = declared_len(remaining);
        if declared > max_frame_size {
            return Err(FramingError::FrameTooLarge {
                declared,
                max: max_frame_size,
            });
        }
        if remaining.len() < PREFIX_LEN + declared {
            break;
        }
        if declared == 0 {
            return Err(FramingError::Malformed("declared frame length is zero".to_string()));
        }
        let body = &remaining[PREFIX_LEN..PREFIX_LEN + declared];
        frames.push(
            serde_json::from_slice(body).map_err(|e| FramingError::Malformed(e.to_string())),
        );
        offset += PREFIX_LEN + declared;
    }

    Ok((frames, buf[offset..].to_vec()))
}

fn decode_one<T: DeserializeOwned>(
    buf: &[u8],
    max_frame_size: usize,
) -> Result<(Result<T, FramingError>, &[u8]), FramingError> {
    if buf.len() < PREFIX_LEN {
        return Err(FramingError::TruncatedPrefix { len: buf.len() });
    }
    let declared = declared_len(buf);
    if declared == 0 {
        return Err(FramingError::Malformed("declared frame length is zero".to_string()));
    }
    if declared > max_frame_size {
        return Err(FramingError::FrameTooLarge {
            declared,
            max: max_frame_size,
        });
    }
    if buf.len() < PREFIX_LEN + declared {
        return Err(FramingError::TruncatedBody {
            available: buf.len() - PREFIX_LEN,
            declared,
        });
    }
    let body = &buf[PREFIX_LEN..PREFIX_LEN + declared];
    let value = serde_json::from_slice(body).map_err(|e| FramingError::Malformed(e.to_string()));
    Ok((value, &buf[PREFIX_LEN + declared..]))
}

fn declared_len(buf: &[u8]) -> usize {
    u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize
}

/// Encodes a [`Request`] using [`DEFAULT_MAX_FRAME_SIZE`].
///
/// # Errors
///
/// See [`encode`].
pub fn encode_request(req: &Request) -> Result<Vec<u8>, FramingError> {
    encode(req, DEFAULT_MAX_FRAME_SIZE)
}

/// Encodes a [`Response`] using [`DEFAULT_MAX_FRAME_SIZE`].
///
/// # Errors
///
/// See [`encode`].
pub fn encode_response(resp: &Response) -> Result<Vec<u8>, FramingError> {
    encode(resp, DEFAULT_MAX_FRAME_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_through_encode_decode() {
        let value = json!({"hello": "world", "n": 3});
        let frame = encode(&value, DEFAULT_MAX_FRAME_SIZE).unwrap();
        let back: serde_json::Value = decode(&frame, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn rejects_oversized_frame_at_encode_time() {
        let big = "x".repeat(100);
        let err = encode(&big, 10).unwrap_err();
        assert!(matches!(err, FramingError::FrameTooLarge { .. }));
    }

    #[test]
    fn rejects_truncated_prefix() {
        let err = decode::<serde_json::Value>(&[1, 2], DEFAULT_MAX_FRAME_SIZE).unwrap_err();
        assert!(matches!(err, FramingError::TruncatedPrefix { len: 2 }));
    }

    #[test]
    fn rejects_truncated_body() {
        let frame = encode(&json!("hello world"), DEFAULT_MAX_FRAME_SIZE).unwrap();
        let truncated = &frame[..frame.len() - 2];
        let err = decode::<serde_json::Value>(truncated, DEFAULT_MAX_FRAME_SIZE).unwrap_err();
        assert!(matches!(err, FramingError::TruncatedBody { .. }));
    }

    #[test]
    fn extract_all_pulls_multiple_frames_from_one_buffer() {
        let mut buf = Vec::new();
        buf.extend(encode(&json!(1), DEFAULT_MAX_FRAME_SIZE).unwrap());
        buf.extend(encode(&json!(2), DEFAULT_MAX_FRAME_SIZE).unwrap());
        buf.extend(encode(&json!(3), DEFAULT_MAX_FRAME_SIZE).unwrap());

        let (frames, leftover) = extract_all::<serde_json::Value>(&buf, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert!(leftover.is_empty());
        let values: Vec<_> = frames.into_iter().map(Result::unwrap).collect();
        assert_eq!(values, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn extract_all_reports_leftover_partial_frame() {
        let mut buf = encode(&json!(1), DEFAULT_MAX_FRAME_SIZE).unwrap();
        buf.extend_from_slice(&[0, 0, 0, 50]);
        buf.extend_from_slice(b"not enough bytes");

        let (frames, leftover) = extract_all::<serde_json::Value>(&buf, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(leftover.len(), 4 + "not enough bytes".len());
    }

    #[test]
    fn extract_all_isolates_a_malformed_frame_without_losing_neighbors() {
        let mut buf = Vec::new();
        buf.extend(encode(&json!(1), DEFAULT_MAX_FRAME_SIZE).unwrap());
        buf.extend(encode_raw(b"not json", DEFAULT_MAX_FRAME_SIZE).unwrap());
        buf.extend(encode(&json!(3), DEFAULT_MAX_FRAME_SIZE).unwrap());

        let (frames, _) = extract_all::<serde_json::Value>(&buf, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames[0].is_ok());
        assert!(frames[1].is_err());
        assert!(frames[2].is_ok());
    }

    #[test]
    fn extract_all_rejects_oversized_declared_length() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(1_000_000_u32).to_be_bytes());
        buf.extend_from_slice(b"short");
        let err = extract_all::<serde_json::Value>(&buf, 1024).unwrap_err();
        assert!(matches!(err, FramingError::FrameTooLarge { .. }));
    }
}
