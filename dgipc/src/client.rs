//! Datagram client: sends correlated requests over a Unix-domain datagram
//! socket and awaits replies on an ephemeral reply socket (spec §4.7).
//!
//! Each `send` owns its ephemeral reply socket for the lifetime of one
//! call: bound freshly, awaited once, and unlinked on every exit path
//! (success, error, cancel, timeout) via [`ReplySocketGuard`], the "scoped
//! acquisition primitive" spec §9 asks for in place of manual cleanup
//! scattered across early returns.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dgipc_core::{ManifestValidator, Request, Response, TaxonomyError};
use serde_json::Value;
use tokio::net::UnixDatagram;
use tokio::sync::oneshot;

use crate::addr::{unique_reply_path, validate_socket_path};
use crate::codec;
use crate::correlation::{CorrelationRegistry, CorrelationStatistics, RequestHandle};
use crate::observability::metrics;
use crate::timeout::TimeoutManager;

/// Construction options for a [`DatagramClient`] (spec §4.7).
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Logical routing tag attached to every request this client sends.
    pub channel_id: String,
    /// Maximum accepted/sent frame size in bytes.
    pub max_message_size: usize,
    /// Default per-request timeout, used when a call site omits one.
    pub default_timeout: Duration,
    /// Validate outgoing args and incoming results against a manifest.
    pub enable_validation: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            channel_id: String::new(),
            max_message_size: codec::DEFAULT_MAX_FRAME_SIZE,
            default_timeout: Duration::from_secs(30),
            enable_validation: false,
        }
    }
}

/// A signal delivered to an in-flight `send` call out of band: either a
/// timeout fired by the [`TimeoutManager`], or an explicit [`DatagramClient::cancel`].
/// Message passing rather than a shared mutable flag, per spec §9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    TimedOut,
    Cancelled,
}

/// Sends correlated requests to a datagram server and awaits replies.
///
/// Instance-scoped: the correlation registry, timeout manager, and
/// statistics belong to this client alone, so multiple clients in one
/// process (as in a test suite) never share lifecycle state (spec §9).
pub struct DatagramClient {
    socket_path: String,
    reply_dir: PathBuf,
    channel_id: String,
    max_message_size: usize,
    default_timeout: Duration,
    enable_validation: bool,
    manifest: Option<Arc<ManifestValidator>>,
    correlation: CorrelationRegistry,
    timeouts: TimeoutManager,
    interrupts: Arc<dashmap::DashMap<uuid::Uuid, oneshot::Sender<Interrupt>>>,
}

impl DatagramClient {
    /// Creates a client targeting `socket_path`, validating the path up
    /// front. Does not open the server socket — only ephemeral reply
    /// sockets are bound, one per `send` call.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Io`] wrapping an [`crate::addr::AddrError`]
    /// if `socket_path` is empty, contains a NUL byte, or exceeds the
    /// platform path limit; the same for `options.channel_id` when it
    /// would make a reply path exceed the limit.
    pub fn new(socket_path: impl Into<String>, options: ClientOptions) -> crate::error::Result<Self> {
        let socket_path = socket_path.into();
        validate_socket_path(&socket_path)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

        let reply_dir = Path::new(&socket_path)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/tmp"));

        Ok(Self {
            socket_path,
            reply_dir,
            channel_id: options.channel_id,
            max_message_size: options.max_message_size,
            default_timeout: options.default_timeout,
            enable_validation: options.enable_validation,
            manifest: None,
            correlation: CorrelationRegistry::new(),
            timeouts: TimeoutManager::with_label("client"),
            interrupts: Arc::new(dashmap::DashMap::new()),
        })
    }

    /// Attaches a manifest validator used when `enable_validation` is set.
    /// Cached for the client's lifetime rather than reloaded per call
    /// (spec §4.7 "fetch (or reuse cached) manifest").
    #[must_use]
    pub fn with_manifest(mut self, manifest: ManifestValidator) -> Self {
        self.manifest = Some(Arc::new(manifest));
        self
    }

    /// Sends `name` with optional `args`, waiting up to `timeout` (or the
    /// client's `default_timeout`) for a reply (spec §4.7).
    ///
    /// # Errors
    ///
    /// - [`TaxonomyError::InvalidParams`] if validation is enabled and
    ///   `args` fails manifest validation.
    /// - [`TaxonomyError::MessageFramingError`] if the encoded request
    ///   would exceed `max_message_size`, checked before any socket I/O.
    /// - [`TaxonomyError::SocketError`] if binding the reply socket or
    ///   sending to `socket_path` fails.
    /// - [`TaxonomyError::HandlerTimeout`] if no reply arrives in time.
    /// - [`TaxonomyError::Cancelled`] if [`DatagramClient::cancel`] or
    ///   [`DatagramClient::cancel_all`] fires while waiting.
    /// - Whatever variant the server's response error maps to (spec §7: a
    ///   `success: false` response is always raised, never handed back as
    ///   `Ok`).
    pub async fn send(
        &self,
        name: &str,
        args: Option<HashMap<String, Value>>,
        timeout: Option<Duration>,
    ) -> Result<Response, TaxonomyError> {
        self.send_as(name, args, timeout, &self.channel_id).await
    }

    /// Shared implementation behind [`DatagramClient::send`] and
    /// [`ChannelProxy::send`]: identical to `send` except the routing tag
    /// attached to the wire request and used for response-shape lookup can
    /// be overridden without mutating or cloning the client itself.
    async fn send_as(
        &self,
        name: &str,
        args: Option<HashMap<String, Value>>,
        timeout: Option<Duration>,
        channel_id: &str,
    ) -> Result<Response, TaxonomyError> {
        if let Some(manifest) = self.validation_manifest() {
            if let Some(args) = &args {
                let report = manifest.validate_request(name, args);
                if !report.valid {
                    let detail = report
                        .errors
                        .iter()
                        .map(|e| format!("{}: {}", e.field, e.message))
                        .collect::<Vec<_>>()
                        .join("; ");
                    return Err(TaxonomyError::InvalidParams(detail));
                }
            }
        }

        let effective_timeout = timeout.unwrap_or(self.default_timeout);
        let request_uuid = uuid::Uuid::new_v4();
        let request_id = request_uuid.to_string();
        let reply_path = unique_reply_path(self.reply_dir.to_string_lossy().as_ref())
            .map_err(|e| TaxonomyError::SocketError(e.to_string()))?;

        let request = Request {
            id: request_id.clone(),
            channel_id: channel_id.to_string(),
            request: name.to_string(),
            reply_to: Some(reply_path.clone()),
            args,
            timeout: Some(effective_timeout.as_secs_f64()),
            timestamp: Request::now_timestamp(),
        };

        let frame = codec::encode_request(&request)
            .map_err(|e| TaxonomyError::MessageFramingError(e.to_string()))?;
        if frame.len() > self.max_message_size {
            return Err(TaxonomyError::MessageFramingError(format!(
                "encoded request is {} bytes, exceeding max_message_size of {}",
                frame.len(),
                self.max_message_size
            )));
        }

        let guard = ReplySocketGuard::bind(&reply_path)
            .await
            .map_err(|e| TaxonomyError::SocketError(e.to_string()))?;

        let started = Instant::now();
        guard
            .socket
            .send_to(&frame, &self.socket_path)
            .await
            .map_err(|e| TaxonomyError::SocketError(e.to_string()))?;

        let handle = self
            .correlation
            .register(request_uuid, name.to_string(), channel_id.to_string());
        let (interrupt_tx, interrupt_rx) = oneshot::channel();
        self.interrupts.insert(request_uuid, interrupt_tx);

        if effective_timeout.is_zero() {
            self.interrupts.remove(&request_uuid);
            self.correlation.mark_timed_out(&handle);
            self.correlation.forget(&handle);
            metrics::record_timeout(name);
            return Err(TaxonomyError::HandlerTimeout { elapsed_secs: 0.0 });
        }

        let interrupts = self.interrupts.clone();
        let timeout_id = request_id.clone();
        self.timeouts.register(request_id.clone(), effective_timeout, move |_id| {
            if let Some((_, tx)) = interrupts.remove(&request_uuid) {
                let _ = tx.send(Interrupt::TimedOut);
            }
        });

        let outcome = wait_for_reply(&guard.socket, self.max_message_size, interrupt_rx).await;
        self.interrupts.remove(&request_uuid);
        self.timeouts.cancel(&timeout_id);

        match outcome {
            WaitOutcome::Received(bytes) => {
                let response: Response = codec::decode(&bytes, self.max_message_size)
                    .map_err(|e| TaxonomyError::MessageFramingError(e.to_string()))?;
                metrics::record_response(name, response.success, response.error.as_ref().map(|e| e.code));
                metrics::record_request_duration(name, started.elapsed());

                if !response.success {
                    self.correlation.resolve(&handle);
                    let elapsed_secs = started.elapsed().as_secs_f64();
                    return Err(response.error.as_ref().map_or_else(
                        || TaxonomyError::InternalError("error response missing error payload".to_string()),
                        |e| TaxonomyError::from_response_error(e, elapsed_secs),
                    ));
                }

                if let Some(manifest) = self.validation_manifest() {
                    if let Some(result) = &response.result {
                        let report = manifest.validate_response(channel_id, name, result);
                        if !report.valid {
                            let detail = report
                                .errors
                                .iter()
                                .map(|e| format!("{}: {}", e.field, e.message))
                                .collect::<Vec<_>>()
                                .join("; ");
                            self.correlation.forget(&handle);
                            return Err(TaxonomyError::InvalidParams(detail));
                        }
                    }
                }
                self.correlation.resolve(&handle);
                Ok(response)
            }
            WaitOutcome::Interrupted(Interrupt::TimedOut) => {
                self.correlation.mark_timed_out(&handle);
                self.correlation.forget(&handle);
                metrics::record_timeout(name);
                Err(TaxonomyError::HandlerTimeout {
                    elapsed_secs: started.elapsed().as_secs_f64(),
                })
            }
            WaitOutcome::Interrupted(Interrupt::Cancelled) => {
                self.correlation.forget(&handle);
                Err(TaxonomyError::Cancelled)
            }
            WaitOutcome::Failed(e) => {
                self.correlation.forget(&handle);
                Err(TaxonomyError::SocketError(e.to_string()))
            }
        }
    }

    /// Fire-and-forget send: no `reply_to`, no reply socket, no wait
    /// (spec §4.7).
    ///
    /// # Errors
    ///
    /// Same framing/socket errors as [`DatagramClient::send`], minus
    /// anything related to awaiting a reply.
    pub async fn send_no_response(
        &self,
        name: &str,
        args: Option<HashMap<String, Value>>,
    ) -> Result<(), TaxonomyError> {
        if let Some(manifest) = self.validation_manifest() {
            if let Some(args) = &args {
                let report = manifest.validate_request(name, args);
                if !report.valid {
                    let detail = report
                        .errors
                        .iter()
                        .map(|e| format!("{}: {}", e.field, e.message))
                        .collect::<Vec<_>>()
                        .join("; ");
                    return Err(TaxonomyError::InvalidParams(detail));
                }
            }
        }

        let request = Request {
            id: uuid::Uuid::new_v4().to_string(),
            channel_id: self.channel_id.clone(),
            request: name.to_string(),
            reply_to: None,
            args,
            timeout: None,
            timestamp: Request::now_timestamp(),
        };
        let frame = codec::encode_request(&request)
            .map_err(|e| TaxonomyError::MessageFramingError(e.to_string()))?;
        if frame.len() > self.max_message_size {
            return Err(TaxonomyError::MessageFramingError(format!(
                "encoded request is {} bytes, exceeding max_message_size of {}",
                frame.len(),
                self.max_message_size
            )));
        }

        let socket = UnixDatagram::unbound().map_err(|e| TaxonomyError::SocketError(e.to_string()))?;
        socket
            .send_to(&frame, &self.socket_path)
            .await
            .map_err(|e| TaxonomyError::SocketError(e.to_string()))?;
        Ok(())
    }

    /// Cancels one in-flight `send`, waking it with a cancellation error.
    /// Returns `true` if it was still pending.
    #[must_use]
    pub fn cancel(&self, handle: &RequestHandle) -> bool {
        let cancelled = self.correlation.cancel_one(handle);
        if cancelled {
            if let Some((_, tx)) = self.interrupts.remove(&handle.raw_id()) {
                let _ = tx.send(Interrupt::Cancelled);
            }
        }
        cancelled
    }

    /// Cancels every in-flight `send`, returning how many were pending.
    pub fn cancel_all(&self) -> usize {
        let ids: Vec<uuid::Uuid> = self.interrupts.iter().map(|e| *e.key()).collect();
        let mut count = 0;
        for id in ids {
            if let Some((_, tx)) = self.interrupts.remove(&id) {
                if tx.send(Interrupt::Cancelled).is_ok() {
                    count += 1;
                }
            }
        }
        self.correlation.cancel_all();
        count
    }

    /// Launches `requests` concurrently and resolves all of them,
    /// preserving input order in the returned `Vec` regardless of
    /// completion order (spec §4.7, §5).
    pub async fn execute_parallel(
        &self,
        requests: Vec<(String, Option<HashMap<String, Value>>)>,
    ) -> Vec<Result<Response, TaxonomyError>> {
        let futures = requests
            .into_iter()
            .map(|(name, args)| self.send(&name, args, None));
        futures::future::join_all(futures).await
    }

    /// Returns a lightweight view pinning `channel_id` for subsequent
    /// sends, without duplicating client state or opening a socket
    /// (spec §4.7, §9).
    #[must_use]
    pub fn channel_proxy(&self, channel_id: impl Into<String>) -> ChannelProxy<'_> {
        ChannelProxy {
            client: self,
            channel_id: channel_id.into(),
        }
    }

    /// Pending/resolved counters and mean response time across every
    /// `send` this client has issued.
    #[must_use]
    pub fn statistics(&self) -> CorrelationStatistics {
        self.correlation.statistics()
    }

    fn validation_manifest(&self) -> Option<&ManifestValidator> {
        if self.enable_validation {
            self.manifest.as_deref()
        } else {
            None
        }
    }
}

/// A lightweight view of a [`DatagramClient`] that pins `channel_id`
/// (spec §4.7, §9 "Channel proxy"). Does not duplicate client state or
/// open an additional socket.
pub struct ChannelProxy<'a> {
    client: &'a DatagramClient,
    channel_id: String,
}

impl ChannelProxy<'_> {
    /// Sends through the owning client, using the pinned channel id in
    /// place of the client's own — without duplicating client state or
    /// opening an additional socket (spec §4.7, §9 "Channel proxy").
    ///
    /// # Errors
    ///
    /// Same as [`DatagramClient::send`].
    pub async fn send(
        &self,
        name: &str,
        args: Option<HashMap<String, Value>>,
        timeout: Option<Duration>,
    ) -> Result<Response, TaxonomyError> {
        self.client.send_as(name, args, timeout, &self.channel_id).await
    }
}

enum WaitOutcome {
    Received(Vec<u8>),
    Interrupted(Interrupt),
    Failed(std::io::Error),
}

async fn wait_for_reply(
    socket: &UnixDatagram,
    max_message_size: usize,
    interrupt: oneshot::Receiver<Interrupt>,
) -> WaitOutcome {
    let mut buf = vec![0u8; max_message_size.min(u32::MAX as usize)];
    tokio::select! {
        result = socket.recv(&mut buf) => match result {
            Ok(len) => WaitOutcome::Received(buf[..len].to_vec()),
            Err(e) => WaitOutcome::Failed(e),
        },
        signal = interrupt => match signal {
            Ok(interrupt) => WaitOutcome::Interrupted(interrupt),
            Err(_) => WaitOutcome::Failed(std::io::Error::other("interrupt channel dropped")),
        },
    }
}

/// Owns an ephemeral reply socket for the duration of one `send`,
/// unlinking its path on drop regardless of how the call exits (spec §9
/// "prefer a scoped acquisition primitive").
struct ReplySocketGuard {
    socket: UnixDatagram,
    path: PathBuf,
}

impl ReplySocketGuard {
    async fn bind(path: &str) -> std::io::Result<Self> {
        let socket = UnixDatagram::bind(path)?;
        Ok(Self {
            socket,
            path: PathBuf::from(path),
        })
    }
}

impl Drop for ReplySocketGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
