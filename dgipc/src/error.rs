//! Top-level error type for the `dgipc` runtime crate.

use thiserror::Error;

pub use dgipc_core::TaxonomyError;

/// Top-level error type for `dgipc` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A client/server operation failed with a taxonomy error (spec §6-7).
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),

    /// Configuration was structurally invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error (socket bind, manifest file read, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for `dgipc` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration-layer error: a field failed validation, or the
/// configuration file could not be parsed into the expected shape.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more fields failed validation; see [`dgipc_core::ValidationIssue`]
    /// for the per-field detail this summary is built from.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The manifest referenced by the configuration could not be loaded.
    #[error("manifest error: {0}")]
    Manifest(String),
}
