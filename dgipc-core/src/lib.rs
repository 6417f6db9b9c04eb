//! dgipc-core — shared wire types, manifest model, and error taxonomy.
//!
//! This crate is the dependency-light foundation shared by the `dgipc`
//! runtime crate: the request/response JSON shapes that cross the wire, the
//! manifest schema used to validate them, and the JSON-RPC-style error
//! taxonomy raised by clients and embedded in server responses.

pub mod error;
pub mod manifest;
pub mod model;

pub use error::{ErrorCode, ErrorData, ResponseError, Severity, TaxonomyError, ValidationIssue};
pub use manifest::{
    ArgumentSpec, Manifest, ManifestValidator, ResponseSpec, ValidationConstraints,
    ValidationError, ValidationReport,
};
pub use model::{Request, Response};
