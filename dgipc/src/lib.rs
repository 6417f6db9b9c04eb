//! `dgipc` — request/response IPC framework over Unix-domain datagram
//! sockets.
//!
//! Pairs with `dgipc-core` for the wire types, manifest model, and error
//! taxonomy shared by the [`client`] and [`server`] runtimes here.

pub mod addr;
pub mod cli;
pub mod client;
pub mod codec;
pub mod config;
pub mod correlation;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod server;
pub mod timeout;

pub use dgipc_core::{
    ArgumentSpec, ErrorCode, ErrorData, Manifest, ManifestValidator, Request, Response,
    ResponseError, ResponseSpec, Severity, TaxonomyError, ValidationConstraints, ValidationError,
    ValidationIssue, ValidationReport,
};

pub use client::{ChannelProxy, ClientOptions, DatagramClient};
pub use correlation::{CorrelationRegistry, CorrelationStatistics, RequestHandle, RequestStatus};
pub use handlers::{Handler, HandlerRegistry};
pub use server::DatagramServer;
pub use timeout::{TimeoutManager, TimeoutStatistics};

/// Build-time metadata generated by `build.rs` via the `built` crate
/// (version, git commit, target triple) — surfaced by `dgipc version`.
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
