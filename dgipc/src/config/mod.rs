//! Configuration: schema, file loading, and validation (spec §3 ambient).

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_client_config, load_manifest, load_server_config};
pub use schema::{ClientConfig, ServerConfig};
pub use validation::{ValidationResult, Validator};
