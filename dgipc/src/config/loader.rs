//! Thin configuration and manifest file loading (spec §3 ambient).
//!
//! Deliberately does not replicate the teacher's `$include`/`$file`/
//! `$generate` directive pipeline: loading a manifest from disk is an
//! external adapter the spec places out of scope (spec.md §4.3 Non-goals),
//! so this is read-file, parse-YAML-or-JSON, deserialize, validate — and
//! nothing else.

use std::path::Path;

use dgipc_core::Manifest;
use serde::de::DeserializeOwned;

use crate::config::schema::{ClientConfig, ServerConfig};
use crate::config::validation::{ValidationResult, Validator};
use crate::error::{ConfigError, Error, Result};

/// Loads and validates a [`ServerConfig`] from a YAML or JSON file
/// (selected by extension; unrecognized extensions are parsed as YAML,
/// which is a superset of JSON).
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read, [`Error::Yaml`]/
/// [`Error::Json`] if it cannot be parsed, and [`Error::Config`] if it
/// parses but fails validation.
pub fn load_server_config(path: &Path) -> Result<(ServerConfig, ValidationResult)> {
    let config: ServerConfig = parse_file(path)?;
    let result = Validator::new().validate_server(&config);
    if result.has_errors() {
        return Err(Error::Config(ConfigError::Invalid(summarize(&result))));
    }
    Ok((config, result))
}

/// Loads and validates a [`ClientConfig`] from a YAML or JSON file.
///
/// # Errors
///
/// See [`load_server_config`].
pub fn load_client_config(path: &Path) -> Result<(ClientConfig, ValidationResult)> {
    let config: ClientConfig = parse_file(path)?;
    let result = Validator::new().validate_client(&config);
    if result.has_errors() {
        return Err(Error::Config(ConfigError::Invalid(summarize(&result))));
    }
    Ok((config, result))
}

/// Loads a manifest from a YAML or JSON file without further validation —
/// callers build a [`dgipc_core::ManifestValidator`] from the result.
///
/// # Errors
///
/// Returns [`Error::Io`]/[`Error::Yaml`]/[`Error::Json`] as above.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    parse_file(path)
}

fn parse_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)?;
    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        Ok(serde_json::from_str(&contents)?)
    } else {
        Ok(serde_yaml::from_str(&contents)?)
    }
}

fn summarize(result: &ValidationResult) -> String {
    result
        .errors
        .iter()
        .map(std::string::ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
