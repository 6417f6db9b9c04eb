//! Datagram server: binds a Unix-domain `SOCK_DGRAM` socket, decodes framed
//! requests, dispatches them to registered handlers, and replies to the
//! caller's ephemeral reply socket when one was given (spec §4.8).
//!
//! State machine per request: Received → Validated (or Rejected) →
//! Dispatched → Completed|Errored|TimedOut → Replied (if `reply_to`) |
//! Dropped.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dgipc_core::{ManifestValidator, Request, Response, ResponseError, TaxonomyError};
use tokio::net::UnixDatagram;
use tokio_util::sync::CancellationToken;

use crate::codec;
use crate::error::{Error, Result};
use crate::handlers::HandlerRegistry;
use crate::observability::metrics;
use crate::observability::{Event, EventEmitter};

pub use crate::config::schema::ServerConfig;

/// Binds a socket, dispatches incoming requests to a [`HandlerRegistry`],
/// and replies to each request's `reply_to` socket when present (spec §4.8).
///
/// Instance-scoped like [`crate::client::DatagramClient`] — nothing here is
/// process-global, so more than one server can run in the same process
/// (e.g. in a test suite) without interfering with one another.
pub struct DatagramServer {
    config: ServerConfig,
    handlers: HandlerRegistry,
    manifest: Option<Arc<ManifestValidator>>,
    events: Arc<EventEmitter>,
    recent_clients: Arc<RecentClients>,
    cancel: CancellationToken,
}

impl DatagramServer {
    /// Creates a server from `config`. Does not touch the filesystem or
    /// bind a socket — that happens in [`DatagramServer::start_listening`].
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let recent_clients = Arc::new(RecentClients::new(config.max_connections));
        Self {
            config,
            handlers: HandlerRegistry::new(),
            manifest: None,
            events: Arc::new(EventEmitter::noop()),
            recent_clients,
            cancel: CancellationToken::new(),
        }
    }

    /// Attaches a manifest validator, used to reject malformed request
    /// arguments before dispatch (spec §4.3, §4.8 "Validated (or Rejected)").
    #[must_use]
    pub fn with_manifest(mut self, manifest: ManifestValidator) -> Self {
        self.manifest = Some(Arc::new(manifest));
        self
    }

    /// Replaces the default no-op event emitter with `events` (spec §6
    /// "Events emitted by the server").
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventEmitter>) -> Self {
        self.events = events;
        self
    }

    /// The handler registry backing this server. Callers register handlers
    /// on it before calling [`DatagramServer::start_listening`].
    #[must_use]
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// Number of distinct `(channel_id, reply_to)` pairs seen recently,
    /// bounded by `config.max_connections` (spec §4.8 step 7).
    #[must_use]
    pub fn recent_client_count(&self) -> usize {
        self.recent_clients.len()
    }

    /// Binds `config.bind_path` and serves requests until
    /// [`DatagramServer::stop`] is called or the socket errors fatally
    /// (spec §4.8).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if an existing file at `bind_path` cannot be
    /// removed (when `cleanup_on_start` is set) or if the socket cannot be
    /// bound.
    pub async fn start_listening(&self) -> Result<()> {
        let path = &self.config.bind_path;

        if self.config.cleanup_on_start {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::Io(e)),
            }
        }

        let socket = Arc::new(UnixDatagram::bind(path)?);
        self.events.emit(Event::Listening {
            timestamp: chrono::Utc::now(),
            bind_path: path.clone(),
        });
        tracing::info!(bind_path = %path, "dgipc server listening");

        let mut buf = vec![0u8; self.config.max_message_size.min(u32::MAX as usize)];
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                result = socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, _addr)) => {
                            metrics::record_frame_size(len);
                            // Spawned so one slow handler cannot stall the
                            // receive loop for every other client (spec §5
                            // "handlers may run concurrently"); the datagram
                            // is copied out since `buf` is reused next
                            // iteration.
                            let datagram = buf[..len].to_vec();
                            let ctx = RequestContext {
                                config: self.config.clone(),
                                handlers: self.handlers.clone(),
                                manifest: self.manifest.clone(),
                                events: self.events.clone(),
                                recent_clients: self.recent_clients.clone(),
                                socket: socket.clone(),
                            };
                            tokio::spawn(async move { ctx.handle_datagram(datagram).await });
                        }
                        Err(e) => {
                            self.events.emit(Event::Error {
                                timestamp: chrono::Utc::now(),
                                code: None,
                                message: format!("recvfrom failed: {e}"),
                            });
                            metrics::record_error("socket");
                        }
                    }
                }
            }
            metrics::set_active_connections(self.recent_clients.len() as u64);
        }

        if self.config.cleanup_on_shutdown {
            let _ = std::fs::remove_file(path);
        }
        self.events.emit(Event::Shutdown {
            timestamp: chrono::Utc::now(),
            reason: "stop() called".to_string(),
        });
        Ok(())
    }

    /// Signals [`DatagramServer::start_listening`] to return. Interrupts
    /// the receive loop within a bounded delay rather than waiting for the
    /// next datagram (spec §4.8 "interrupt the receive loop within a
    /// bounded delay").
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Per-request handle on the shared server state, owned independently of
/// `&self` so dispatch-and-reply can run as its own spawned task instead of
/// serializing inside the receive loop (spec §5).
struct RequestContext {
    config: ServerConfig,
    handlers: HandlerRegistry,
    manifest: Option<Arc<ManifestValidator>>,
    events: Arc<EventEmitter>,
    recent_clients: Arc<RecentClients>,
    socket: Arc<UnixDatagram>,
}

impl RequestContext {
    async fn handle_datagram(&self, bytes: Vec<u8>) {
        let request: Request = match codec::decode(&bytes, self.config.max_message_size) {
            Ok(req) => req,
            Err(e) => {
                if self.config.debug_logging {
                    tracing::debug!(error = %e, "dropping malformed frame");
                }
                metrics::record_error("framing");
                return;
            }
        };

        self.events.emit(Event::Request {
            timestamp: chrono::Utc::now(),
            request_id: request.id.clone(),
            name: request.request.clone(),
            channel_id: request.channel_id.clone(),
        });
        metrics::record_request(&request.request);
        self.recent_clients
            .touch(&request.channel_id, request.reply_to.as_deref());

        let started = Instant::now();
        let outcome = self.dispatch(&request).await;
        let duration = started.elapsed();

        let response = match outcome {
            Ok(result) => Response::success(request.id.clone(), request.channel_id.clone(), result),
            Err(error) => Response::failure(request.id.clone(), request.channel_id.clone(), error),
        };
        metrics::record_response(
            &request.request,
            response.success,
            response.error.as_ref().map(|e| e.code),
        );
        metrics::record_request_duration(&request.request, duration);

        self.events.emit(Event::Response {
            timestamp: chrono::Utc::now(),
            request_id: request.id.clone(),
            success: response.success,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        });

        let Some(reply_to) = request.reply_to.as_deref() else {
            return;
        };
        let frame = match codec::encode_response(&response) {
            Ok(frame) => frame,
            Err(e) => {
                metrics::record_error("framing");
                tracing::warn!(error = %e, "failed to encode response");
                return;
            }
        };
        if let Err(e) = self.socket.send_to(&frame, reply_to).await {
            metrics::record_error("socket");
            tracing::warn!(error = %e, reply_to, "failed to send response");
        }
    }

    async fn dispatch(&self, request: &Request) -> std::result::Result<serde_json::Value, ResponseError> {
        if let Some(manifest) = &self.manifest {
            let args = request.args.clone().unwrap_or_default();
            let report = manifest.validate_request(&request.request, &args);
            if !report.valid {
                let detail = report
                    .errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(TaxonomyError::InvalidParams(detail).to_response_error());
            }
        }

        let effective_timeout = request
            .timeout
            .map_or(self.config.default_timeout, |t| t.min(self.config.default_timeout));
        let args = request.args.clone().unwrap_or_default();

        match tokio::time::timeout(
            Duration::from_secs_f64(effective_timeout.max(0.0)),
            self.handlers.dispatch_to_response_error(&request.request, args),
        )
        .await
        {
            Ok(result) => result,
            Err(_elapsed) => {
                metrics::record_timeout(&request.request);
                Err(TaxonomyError::HandlerTimeout {
                    elapsed_secs: effective_timeout,
                }
                .to_response_error())
            }
        }
    }
}

/// Bounded LRU of recently seen `(channel_id, reply_to)` pairs, evicting
/// the least-recently-touched entry once `capacity` is reached (spec §4.8
/// step 7). Purely observational — nothing in request handling depends on
/// whether an entry is still present.
struct RecentClients {
    capacity: usize,
    state: Mutex<RecentClientsState>,
}

#[derive(Default)]
struct RecentClientsState {
    entries: HashMap<(String, Option<String>), Instant>,
    order: VecDeque<(String, Option<String>)>,
}

impl RecentClients {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(RecentClientsState::default()),
        }
    }

    fn touch(&self, channel_id: &str, reply_to: Option<&str>) {
        let key = (channel_id.to_string(), reply_to.map(str::to_string));
        let mut state = self.state.lock().unwrap();
        if state.entries.remove(&key).is_some() {
            state.order.retain(|k| k != &key);
        } else if state.entries.len() >= self.capacity {
            if let Some(oldest) = state.order.pop_front() {
                state.entries.remove(&oldest);
            }
        }
        state.entries.insert(key.clone(), Instant::now());
        state.order.push_back(key);
    }

    fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::logging::LogFormat;
    use serde_json::json;
    use std::collections::HashMap as StdHashMap;
    use tempfile::tempdir;

    fn config(bind_path: &str) -> ServerConfig {
        ServerConfig {
            bind_path: bind_path.to_string(),
            max_connections: 4,
            default_timeout: 2.0,
            max_message_size: codec::DEFAULT_MAX_FRAME_SIZE,
            cleanup_on_start: true,
            cleanup_on_shutdown: true,
            debug_logging: false,
            manifest_path: None,
            metrics_port: None,
            log_format: LogFormat::Human,
        }
    }

    #[tokio::test]
    async fn ping_round_trip_succeeds() {
        let dir = tempdir().unwrap();
        let sock = dir.path().join("server.sock");
        let server = Arc::new(DatagramServer::new(config(sock.to_string_lossy().as_ref())));
        server
            .handlers()
            .register_fn("ping", |_args| {
                Box::pin(async { Ok(json!({"pong": true})) })
            })
            .unwrap();

        let server_task = tokio::spawn({
            let server = server.clone();
            async move { server.start_listening().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let client = crate::client::DatagramClient::new(
            sock.to_string_lossy().to_string(),
            crate::client::ClientOptions {
                default_timeout: Duration::from_secs(2),
                ..Default::default()
            },
        )
        .unwrap();

        let response = client.send("ping", None, None).await.unwrap();
        assert!(response.success);
        assert_eq!(response.result.unwrap()["pong"], json!(true));

        server.stop();
        server_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn echo_passes_arguments_through() {
        let dir = tempdir().unwrap();
        let sock = dir.path().join("server.sock");
        let server = Arc::new(DatagramServer::new(config(sock.to_string_lossy().as_ref())));
        server
            .handlers()
            .register_fn("echo", |args| {
                Box::pin(async move {
                    Ok(json!({ "echo": args.get("message").cloned().unwrap_or(json!(null)) }))
                })
            })
            .unwrap();

        let server_task = tokio::spawn({
            let server = server.clone();
            async move { server.start_listening().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let client = crate::client::DatagramClient::new(
            sock.to_string_lossy().to_string(),
            crate::client::ClientOptions {
                default_timeout: Duration::from_secs(2),
                ..Default::default()
            },
        )
        .unwrap();

        let mut args = StdHashMap::new();
        args.insert("message".to_string(), json!("Hello from test!"));
        let response = client.send("echo", Some(args), None).await.unwrap();
        assert_eq!(response.result.unwrap()["echo"], json!("Hello from test!"));

        server.stop();
        server_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn unregistered_handler_yields_method_not_found() {
        let dir = tempdir().unwrap();
        let sock = dir.path().join("server.sock");
        let server = Arc::new(DatagramServer::new(config(sock.to_string_lossy().as_ref())));

        let server_task = tokio::spawn({
            let server = server.clone();
            async move { server.start_listening().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let client = crate::client::DatagramClient::new(
            sock.to_string_lossy().to_string(),
            crate::client::ClientOptions {
                default_timeout: Duration::from_secs(2),
                ..Default::default()
            },
        )
        .unwrap();

        let err = client.send("nonexistent", None, None).await.unwrap_err();
        assert!(matches!(err, TaxonomyError::MethodNotFound(_)));

        server.stop();
        server_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn slow_handler_times_out_from_the_client_side() {
        let dir = tempdir().unwrap();
        let sock = dir.path().join("server.sock");
        let server = Arc::new(DatagramServer::new(config(sock.to_string_lossy().as_ref())));
        server
            .handlers()
            .register_fn("slow", |_args| {
                Box::pin(async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Ok(json!({}))
                })
            })
            .unwrap();

        let server_task = tokio::spawn({
            let server = server.clone();
            async move { server.start_listening().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let client = crate::client::DatagramClient::new(
            sock.to_string_lossy().to_string(),
            crate::client::ClientOptions {
                default_timeout: Duration::from_millis(100),
                ..Default::default()
            },
        )
        .unwrap();

        let started = Instant::now();
        let err = client.send("slow", None, Some(Duration::from_millis(100))).await.unwrap_err();
        assert!(matches!(err, TaxonomyError::HandlerTimeout { .. }));
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(client.statistics().total_pending, 0);

        server.stop();
        server_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn fire_and_forget_request_is_dispatched_without_a_reply() {
        let dir = tempdir().unwrap();
        let sock = dir.path().join("server.sock");
        let server = Arc::new(DatagramServer::new(config(sock.to_string_lossy().as_ref())));
        let seen = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let seen2 = seen.clone();
        server
            .handlers()
            .register_fn("notify", move |_args| {
                let seen = seen2.clone();
                Box::pin(async move {
                    seen.store(true, std::sync::atomic::Ordering::SeqCst);
                    Ok(json!({}))
                })
            })
            .unwrap();

        let server_task = tokio::spawn({
            let server = server.clone();
            async move { server.start_listening().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let client = crate::client::DatagramClient::new(
            sock.to_string_lossy().to_string(),
            crate::client::ClientOptions::default(),
        )
        .unwrap();
        client.send_no_response("notify", None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(seen.load(std::sync::atomic::Ordering::SeqCst));

        server.stop();
        server_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn stop_interrupts_the_receive_loop_within_a_bounded_delay() {
        let dir = tempdir().unwrap();
        let sock = dir.path().join("server.sock");
        let server = Arc::new(DatagramServer::new(config(sock.to_string_lossy().as_ref())));

        let server_task = tokio::spawn({
            let server = server.clone();
            async move { server.start_listening().await }
        });
        tokio::time::sleep(Duration::from_millis(30)).await;

        let started = Instant::now();
        server.stop();
        server_task.await.unwrap().unwrap();
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(!sock.exists(), "cleanup_on_shutdown should remove the socket file");
    }

    #[test]
    fn recent_clients_evicts_the_oldest_entry_past_capacity() {
        let clients = RecentClients::new(2);
        clients.touch("a", Some("/tmp/a.sock"));
        clients.touch("b", Some("/tmp/b.sock"));
        clients.touch("c", Some("/tmp/c.sock"));
        assert_eq!(clients.len(), 2);
    }

    #[test]
    fn recent_clients_re_touching_an_entry_does_not_grow_it() {
        let clients = RecentClients::new(2);
        clients.touch("a", Some("/tmp/a.sock"));
        clients.touch("a", Some("/tmp/a.sock"));
        assert_eq!(clients.len(), 1);
    }
}
