//! Configuration schema: `ServerConfig` and `ClientConfig` (spec §3 ambient).

use serde::{Deserialize, Serialize};

use crate::observability::logging::LogFormat;

/// Configuration for a [`crate::server::DatagramServer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Unix-domain socket path to bind and listen on.
    pub bind_path: String,

    /// Maximum number of recent clients tracked for statistics; also used
    /// as a soft ceiling for handler registration (spec §4.6, §4.8).
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Default per-request timeout, applied when a request omits its own
    /// `timeout` (spec §4.8).
    #[serde(default = "default_timeout_secs")]
    pub default_timeout: f64,

    /// Maximum accepted frame size in bytes (spec §4.1).
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Remove a stale socket file at `bind_path` before binding.
    #[serde(default = "default_true")]
    pub cleanup_on_start: bool,

    /// Remove the socket file at `bind_path` on graceful shutdown.
    #[serde(default = "default_true")]
    pub cleanup_on_shutdown: bool,

    /// Enable verbose per-request debug logging.
    #[serde(default)]
    pub debug_logging: bool,

    /// Path to a manifest file used to validate requests/responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<String>,

    /// Port to expose a Prometheus metrics endpoint on, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,

    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_max_connections() -> usize {
    1024
}

fn default_timeout_secs() -> f64 {
    30.0
}

fn default_max_message_size() -> usize {
    crate::codec::DEFAULT_MAX_FRAME_SIZE
}

fn default_true() -> bool {
    true
}

/// Configuration for a [`crate::client::DatagramClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Path of the server's Unix-domain socket.
    pub socket_path: String,

    /// Logical routing tag attached to every request sent by this client.
    pub channel_id: String,

    /// Maximum accepted frame size in bytes (spec §4.1).
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Default per-request timeout, used when a call site does not
    /// override it (spec §4.7).
    #[serde(default = "default_timeout_secs")]
    pub default_timeout: f64,

    /// Validate outgoing requests/incoming responses against a manifest.
    #[serde(default)]
    pub enable_validation: bool,

    /// Path to the manifest used when `enable_validation` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<String>,
}
