//! JSON-RPC-style error taxonomy shared by the client and server (spec §6-7).
//!
//! `TaxonomyError` is the single error type a client `send` call can raise;
//! `ResponseError` is its wire representation, embedded in a [`crate::model::Response`]
//! when `success` is `false`. The two are kept distinct so that a response
//! payload (plain data, `Serialize`/`Deserialize`) never needs to carry a
//! `std::error::Error` impl.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable JSON-RPC-compatible error codes, plus the extensions this
/// framework needs (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// No handler registered for the request name.
    MethodNotFound,
    /// Manifest validation failure or otherwise malformed arguments.
    InvalidParams,
    /// A handler raised an untyped error.
    InternalError,
    /// Transport-level failure (bind/sendto/recvfrom, bad path, permissions).
    ServerError,
    /// Syscall-level socket failure.
    SocketError,
    /// A request or handler exceeded its deadline.
    HandlerTimeout,
    /// Frame violated the length-prefix discipline.
    MessageFramingError,
}

impl ErrorCode {
    /// The wire integer for this code (spec §6).
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::MethodNotFound => -32_601,
            Self::InvalidParams => -32_602,
            Self::InternalError => -32_603,
            // Extended codes: implementation-defined, kept out of the
            // standard JSON-RPC range and given stable, distinct values.
            Self::ServerError => -32_000,
            Self::SocketError => -32_001,
            Self::HandlerTimeout => -32_002,
            Self::MessageFramingError => -32_003,
        }
    }

    /// Recovers a code from its wire integer, if it is one of ours.
    #[must_use]
    pub const fn from_i64(code: i64) -> Option<Self> {
        match code {
            -32_601 => Some(Self::MethodNotFound),
            -32_602 => Some(Self::InvalidParams),
            -32_603 => Some(Self::InternalError),
            -32_000 => Some(Self::ServerError),
            -32_001 => Some(Self::SocketError),
            -32_002 => Some(Self::HandlerTimeout),
            -32_003 => Some(Self::MessageFramingError),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::MethodNotFound => "MethodNotFound",
            Self::InvalidParams => "InvalidParams",
            Self::InternalError => "InternalError",
            Self::ServerError => "ServerError",
            Self::SocketError => "SocketError",
            Self::HandlerTimeout => "HandlerTimeout",
            Self::MessageFramingError => "MessageFramingError",
        };
        write!(f, "{name}")
    }
}

/// The error a client `send` call raises. Never crosses the wire directly —
/// see [`ResponseError`] for the serialized form embedded in a response.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    /// Manifest validation rejected the request arguments before any I/O.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// No handler is registered for the requested name.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// The handler raised a non-taxonomy error.
    #[error("internal error: {0}")]
    InternalError(String),

    /// Bind/sendto/recvfrom failed, or the socket path was invalid.
    #[error("socket error: {0}")]
    SocketError(String),

    /// The request or handler execution exceeded its deadline.
    #[error("handler timeout after {elapsed_secs:.3}s")]
    HandlerTimeout {
        /// How long the caller waited before giving up.
        elapsed_secs: f64,
    },

    /// The frame violated the length-prefix discipline (spec §4.1).
    #[error("message framing error: {0}")]
    MessageFramingError(String),

    /// The caller's pending request was cancelled before it resolved.
    #[error("request cancelled")]
    Cancelled,
}

impl TaxonomyError {
    /// The stable error code for this error (spec §6).
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidParams(_) => ErrorCode::InvalidParams,
            Self::MethodNotFound(_) => ErrorCode::MethodNotFound,
            Self::InternalError(_) => ErrorCode::InternalError,
            Self::SocketError(_) => ErrorCode::SocketError,
            Self::HandlerTimeout { .. } => ErrorCode::HandlerTimeout,
            Self::MessageFramingError(_) => ErrorCode::MessageFramingError,
            // Cancellation has no wire representation of its own; callers
            // observe it as a distinct `Result::Err` variant, never as a
            // response (spec §7 "Cancellation is reported distinctly from
            // timeout").
            Self::Cancelled => ErrorCode::InternalError,
        }
    }

    /// Converts this error into its wire form for embedding in a
    /// [`crate::model::Response`].
    #[must_use]
    pub fn to_response_error(&self) -> ResponseError {
        ResponseError {
            code: self.code().as_i64(),
            message: self.to_string(),
            data: None,
        }
    }

    /// Reconstructs a raisable error from a response's wire error payload —
    /// the inverse of [`TaxonomyError::to_response_error`]. A client never
    /// returns a `success: false` response without raising it as an `Err`
    /// first (spec §7); this is how the client recovers the taxonomy
    /// variant from the numeric wire code. `elapsed_secs` is measured
    /// client-side, since the wire payload carries no timing of its own.
    #[must_use]
    pub fn from_response_error(error: &ResponseError, elapsed_secs: f64) -> Self {
        match ErrorCode::from_i64(error.code) {
            Some(ErrorCode::MethodNotFound) => Self::MethodNotFound(error.message.clone()),
            Some(ErrorCode::InvalidParams) => Self::InvalidParams(error.message.clone()),
            Some(ErrorCode::ServerError | ErrorCode::SocketError) => {
                Self::SocketError(error.message.clone())
            }
            Some(ErrorCode::HandlerTimeout) => Self::HandlerTimeout { elapsed_secs },
            Some(ErrorCode::MessageFramingError) => Self::MessageFramingError(error.message.clone()),
            Some(ErrorCode::InternalError) | None => Self::InternalError(
                error
                    .data
                    .as_ref()
                    .map(|d| d.details.clone())
                    .unwrap_or_else(|| error.message.clone()),
            ),
        }
    }
}

/// The wire representation of an error, embedded in a response when
/// `success` is `false` (spec §3, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    /// JSON-RPC-compatible numeric code (spec §6).
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail, e.g. `{"details": "<original handler error>"}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ErrorData>,
}

impl ResponseError {
    /// Builds an `InternalError` response carrying the original handler
    /// error message in `data.details` (spec §4.6, §7).
    #[must_use]
    pub fn internal_with_details(details: impl Into<String>) -> Self {
        let details = details.into();
        Self {
            code: ErrorCode::InternalError.as_i64(),
            message: "internal error".to_string(),
            data: Some(ErrorData { details }),
        }
    }

    /// Builds a `MethodNotFound` response for the given request name.
    #[must_use]
    pub fn method_not_found(name: &str) -> Self {
        Self {
            code: ErrorCode::MethodNotFound.as_i64(),
            message: format!("no handler registered for '{name}'"),
            data: None,
        }
    }
}

/// Structured error detail (spec §3: `error.data.details`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    /// Free-form detail string, typically the original handler error.
    pub details: String,
}

// ============================================================================
// Configuration validation types (ambient — mirrors the teacher's
// `ConfigError`/`ValidationIssue` split for the config layer, distinct from
// the manifest validator's per-request `ValidationError`).
// ============================================================================

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Dotted/indexed path to the offending field.
    pub path: String,
    /// Description of the issue.
    pub message: String,
    /// Whether this issue blocks loading or is merely informational.
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{prefix}: {} at {}", self.message, self.path)
    }
}

/// Severity level for a [`ValidationIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Blocks the configuration from being used.
    Error,
    /// Informational; the configuration still loads.
    Warning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_round_trips_through_wire_integer() {
        for code in [
            ErrorCode::MethodNotFound,
            ErrorCode::InvalidParams,
            ErrorCode::InternalError,
            ErrorCode::ServerError,
            ErrorCode::SocketError,
            ErrorCode::HandlerTimeout,
            ErrorCode::MessageFramingError,
        ] {
            assert_eq!(ErrorCode::from_i64(code.as_i64()), Some(code));
        }
    }

    #[test]
    fn standard_jsonrpc_codes_match_spec() {
        assert_eq!(ErrorCode::MethodNotFound.as_i64(), -32_601);
        assert_eq!(ErrorCode::InvalidParams.as_i64(), -32_602);
        assert_eq!(ErrorCode::InternalError.as_i64(), -32_603);
    }

    #[test]
    fn taxonomy_error_maps_to_stable_code() {
        let err = TaxonomyError::HandlerTimeout { elapsed_secs: 0.1 };
        assert_eq!(err.code(), ErrorCode::HandlerTimeout);
        let resp = err.to_response_error();
        assert_eq!(resp.code, ErrorCode::HandlerTimeout.as_i64());
    }

    #[test]
    fn internal_error_carries_original_message_in_details() {
        let resp = ResponseError::internal_with_details("boom");
        assert_eq!(resp.data.unwrap().details, "boom");
    }

    #[test]
    fn from_response_error_recovers_method_not_found() {
        let resp = ResponseError::method_not_found("nonexistent");
        let err = TaxonomyError::from_response_error(&resp, 0.0);
        assert!(matches!(err, TaxonomyError::MethodNotFound(ref m) if m == &resp.message));
    }

    #[test]
    fn from_response_error_recovers_internal_error_details() {
        let resp = ResponseError::internal_with_details("kaboom");
        let err = TaxonomyError::from_response_error(&resp, 0.0);
        assert!(matches!(err, TaxonomyError::InternalError(ref m) if m == "kaboom"));
    }

    #[test]
    fn from_response_error_recovers_handler_timeout_with_client_measured_elapsed() {
        let resp = ResponseError {
            code: ErrorCode::HandlerTimeout.as_i64(),
            message: "handler timeout after 0.100s".to_string(),
            data: None,
        };
        let err = TaxonomyError::from_response_error(&resp, 0.25);
        assert!(matches!(
            err,
            TaxonomyError::HandlerTimeout { elapsed_secs } if elapsed_secs == 0.25
        ));
    }

    #[test]
    fn validation_issue_display() {
        let issue = ValidationIssue {
            path: "server.max_connections".to_string(),
            message: "must be positive".to_string(),
            severity: Severity::Error,
        };
        assert_eq!(
            issue.to_string(),
            "error: must be positive at server.max_connections"
        );
    }
}
