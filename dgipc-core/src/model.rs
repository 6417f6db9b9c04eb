//! Wire data model: `Request` and `Response` (spec §3, §6).
//!
//! Heterogeneous values (`args`, `result`) are represented with
//! `serde_json::Value`, which already is the tagged sum over
//! `{null, bool, number, string, array, object}` that spec §9 calls for —
//! there is no need to reinvent it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::ResponseError;

/// A request sent from a client to a server (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique within the sending client's pending set; assigned by the
    /// client if absent at construction time.
    pub id: String,

    /// Free-form logical routing tag, echoed back in the response.
    #[serde(default)]
    pub channel_id: String,

    /// Request name — selects a handler and, when validation is enabled, a
    /// manifest entry.
    pub request: String,

    /// Absolute path of an ephemeral reply socket. Presence selects
    /// "expect reply" mode; absence means fire-and-forget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,

    /// Request arguments, validated against the manifest when enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<HashMap<String, Value>>,

    /// Decimal seconds the caller is willing to wait for a reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,

    /// Seconds since epoch, fractional.
    pub timestamp: f64,
}

impl Request {
    /// Seconds-since-epoch timestamp for "now", as used when constructing
    /// a fresh request.
    #[must_use]
    pub fn now_timestamp() -> f64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }

    /// Returns the argument value at `key`, if any.
    #[must_use]
    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.args.as_ref().and_then(|a| a.get(key))
    }
}

/// A response sent from a server back to a client's reply socket (spec §3).
///
/// Invariant: exactly one of `result`/`error` is populated. This is upheld
/// by construction via [`Response::success`] / [`Response::failure`] rather
/// than enforced post hoc, since the type itself must still round-trip
/// arbitrary wire input for interoperability testing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Correlates to the originating request's `id`.
    pub request_id: String,

    /// Echoed from the request, or empty.
    #[serde(default)]
    pub channel_id: String,

    /// Whether the request completed without error.
    pub success: bool,

    /// Present iff `success` is `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Present iff `success` is `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,

    /// Seconds since epoch.
    pub timestamp: f64,
}

impl Response {
    /// Builds a successful response.
    #[must_use]
    pub fn success(request_id: impl Into<String>, channel_id: impl Into<String>, result: Value) -> Self {
        Self {
            request_id: request_id.into(),
            channel_id: channel_id.into(),
            success: true,
            result: Some(result),
            error: None,
            timestamp: Request::now_timestamp(),
        }
    }

    /// Builds a failed response.
    #[must_use]
    pub fn failure(
        request_id: impl Into<String>,
        channel_id: impl Into<String>,
        error: ResponseError,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            channel_id: channel_id.into(),
            success: false,
            result: None,
            error: Some(error),
            timestamp: Request::now_timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn request_round_trips_through_json() {
        let mut args = HashMap::new();
        args.insert("message".to_string(), Value::String("hi".to_string()));
        let req = Request {
            id: "abc".to_string(),
            channel_id: "ch1".to_string(),
            request: "echo".to_string(),
            reply_to: Some("/tmp/reply.sock".to_string()),
            args: Some(args),
            timeout: Some(2.5),
            timestamp: 100.0,
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "abc");
        assert_eq!(back.arg("message").unwrap(), "hi");
    }

    #[test]
    fn response_success_and_failure_are_mutually_exclusive() {
        let ok = Response::success("id1", "ch", serde_json::json!({"pong": true}));
        assert!(ok.success);
        assert!(ok.result.is_some());
        assert!(ok.error.is_none());

        let err = Response::failure(
            "id1",
            "ch",
            ResponseError {
                code: ErrorCode::MethodNotFound.as_i64(),
                message: "nope".to_string(),
                data: None,
            },
        );
        assert!(!err.success);
        assert!(err.result.is_none());
        assert!(err.error.is_some());
    }

    #[test]
    fn request_without_reply_to_omits_field_from_json() {
        let req = Request {
            id: "x".to_string(),
            channel_id: String::new(),
            request: "ping".to_string(),
            reply_to: None,
            args: None,
            timeout: None,
            timestamp: 0.0,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("reply_to"));
    }
}
