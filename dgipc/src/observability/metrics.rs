//! Metrics collection (spec §6 ambient).
//!
//! Provides Prometheus-compatible metrics with label cardinality
//! protection. Unlike a fixed-method protocol, handler names here are
//! registered dynamically at runtime, so cardinality protection is a
//! length/charset sanitizer rather than a known-methods allowlist.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::Error;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Maximum length for a handler-name label before it is truncated.
const MAX_NAME_LABEL_LEN: usize = 64;

/// Sanitizes a handler name for use as a Prometheus label: truncates to
/// [`MAX_NAME_LABEL_LEN`] characters and replaces characters outside
/// `[A-Za-z0-9_-]` with `_`, so an oversized or adversarial request name
/// can't blow up label cardinality or break the exposition format.
#[must_use]
pub fn sanitize_name_label(name: &str) -> String {
    name.chars()
        .take(MAX_NAME_LABEL_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '/' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint (metrics are recorded internally only).
///
/// # Errors
///
/// Returns [`Error::Io`] if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), Error> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!("dgipc_requests_total", "Total number of requests received");
    describe_counter!("dgipc_responses_total", "Total number of responses sent");
    describe_histogram!(
        "dgipc_request_duration_ms",
        "Request processing duration in milliseconds"
    );
    describe_counter!("dgipc_timeouts_total", "Total number of request timeouts");
    describe_counter!("dgipc_errors_total", "Total number of errors by category");
    describe_gauge!(
        "dgipc_pending_requests",
        "Number of requests currently in flight"
    );
    describe_gauge!("dgipc_active_connections", "Number of recently seen clients");
    describe_histogram!("dgipc_frame_size_bytes", "Frame size in bytes");
}

/// Records an incoming request.
pub fn record_request(name: &str) {
    let label = sanitize_name_label(name);
    counter!("dgipc_requests_total", "name" => label).increment(1);
}

/// Records an outgoing response.
pub fn record_response(name: &str, success: bool, error_code: Option<i64>) {
    let label = sanitize_name_label(name);
    let status = if success { "success" } else { "error" };
    let code = error_code.map_or_else(String::new, |c| c.to_string());
    counter!(
        "dgipc_responses_total",
        "name" => label,
        "status" => status,
        "error_code" => code,
    )
    .increment(1);
}

/// Records request processing duration.
pub fn record_request_duration(name: &str, duration: Duration) {
    let label = sanitize_name_label(name);
    histogram!("dgipc_request_duration_ms", "name" => label)
        .record(duration.as_secs_f64() * 1000.0);
}

/// Records a request timeout.
pub fn record_timeout(name: &str) {
    let label = sanitize_name_label(name);
    counter!("dgipc_timeouts_total", "name" => label).increment(1);
}

/// Records an error by category (e.g. `"socket"`, `"framing"`, `"validation"`).
pub fn record_error(category: &str) {
    counter!("dgipc_errors_total", "category" => category.to_owned()).increment(1);
}

/// Sets the number of requests currently pending a reply.
#[allow(clippy::cast_precision_loss)]
pub fn set_pending_requests(count: u64) {
    gauge!("dgipc_pending_requests").set(count as f64);
}

/// Sets the number of recently active client connections.
#[allow(clippy::cast_precision_loss)]
pub fn set_active_connections(count: u64) {
    gauge!("dgipc_active_connections").set(count as f64);
}

/// Records a wire frame's size.
#[allow(clippy::cast_precision_loss)]
pub fn record_frame_size(bytes: usize) {
    histogram!("dgipc_frame_size_bytes").record(bytes as f64);
}
