//! Unix-domain socket path helpers: validation and ephemeral reply paths
//! (spec §4.2, §4.7).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use thiserror::Error;

/// Platform `sun_path` capacity most Unix systems enforce (Linux's
/// `sockaddr_un::sun_path` is 108 bytes including the NUL terminator).
pub const MAX_PATH_LEN: usize = 107;

static REPLY_PATH_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A socket path failed validation (spec §4.2).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddrError {
    /// The path was empty.
    #[error("socket path must not be empty")]
    Empty,

    /// The path contained an interior NUL byte, which Unix socket addresses
    /// cannot represent.
    #[error("socket path must not contain a NUL byte")]
    ContainsNul,

    /// The path exceeded [`MAX_PATH_LEN`].
    #[error("socket path is {len} bytes, exceeding the platform limit of {MAX_PATH_LEN}")]
    TooLong {
        /// The path's length in bytes.
        len: usize,
    },
}

/// Validates a socket path against the constraints every `SOCK_DGRAM`
/// bind/connect call in this crate must uphold.
///
/// # Errors
///
/// See [`AddrError`].
pub fn validate_socket_path(path: &str) -> Result<(), AddrError> {
    if path.is_empty() {
        return Err(AddrError::Empty);
    }
    if path.as_bytes().contains(&0) {
        return Err(AddrError::ContainsNul);
    }
    if path.len() > MAX_PATH_LEN {
        return Err(AddrError::TooLong { len: path.len() });
    }
    Ok(())
}

/// Builds a socket path by joining a directory and a channel-scoped file
/// name, validating the result.
///
/// # Errors
///
/// See [`AddrError`].
pub fn make_addr(dir: &str, name: &str) -> Result<String, AddrError> {
    let joined = if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    };
    validate_socket_path(&joined)?;
    Ok(joined)
}

/// Generates a collision-free ephemeral reply socket path under `dir`
/// (spec §4.7 step 3: "bind an ephemeral reply socket").
///
/// Combines a high-resolution timestamp, a process-local monotonic
/// sequence number, and a random suffix so that rapid, concurrent calls
/// from the same process never collide, even when the system clock has
/// coarse resolution.
///
/// # Errors
///
/// Returns [`AddrError::TooLong`] if `dir` itself is already close to
/// [`MAX_PATH_LEN`], since Unix reply paths have little room to spare.
pub fn unique_reply_path(dir: &str) -> Result<String, AddrError> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seq = REPLY_PATH_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let suffix: u32 = rand::rng().random();
    let name = format!("dgipc-reply-{nanos:x}-{seq:x}-{suffix:08x}.sock");
    make_addr(dir, &name)
}
