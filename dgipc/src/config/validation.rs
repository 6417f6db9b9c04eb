//! Configuration validation (spec §3 ambient).
//!
//! Collects every issue rather than stopping at the first one, so a
//! misconfigured file gets one comprehensive report instead of a
//! fix-one-rerun loop.

use crate::config::schema::{ClientConfig, ServerConfig};
use dgipc_core::{Severity, ValidationIssue};

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Issues that block the configuration from being used.
    pub errors: Vec<ValidationIssue>,
    /// Informational issues; the configuration still loads.
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// `true` if validation passed (no errors; warnings are fine).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Accumulates validation issues across one validation pass.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a fresh validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a [`ServerConfig`], returning every issue found.
    pub fn validate_server(&mut self, config: &ServerConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        if config.bind_path.is_empty() {
            self.add_error("bind_path", "bind_path is required and cannot be empty");
        }
        if let Err(e) = crate::addr::validate_socket_path(&config.bind_path) {
            self.add_error("bind_path", e.to_string());
        }

        if config.max_connections == 0 {
            self.add_error("max_connections", "max_connections must be at least 1");
        }
        if config.max_message_size == 0 {
            self.add_error("max_message_size", "max_message_size must be at least 1");
        }
        if config.max_message_size > 64 * 1024 * 1024 {
            self.add_warning(
                "max_message_size",
                "max_message_size is unusually large (> 64 MiB)",
            );
        }
        if config.default_timeout <= 0.0 {
            self.add_error("default_timeout", "default_timeout must be positive");
        }
        if config.default_timeout > 300.0 {
            self.add_warning(
                "default_timeout",
                "default_timeout is unusually long (> 300s)",
            );
        }
        if let Some(port) = config.metrics_port {
            if port == 0 {
                self.add_error("metrics_port", "metrics_port must not be 0");
            }
        }

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    /// Validates a [`ClientConfig`], returning every issue found.
    pub fn validate_client(&mut self, config: &ClientConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        if let Err(e) = crate::addr::validate_socket_path(&config.socket_path) {
            self.add_error("socket_path", e.to_string());
        }
        if config.channel_id.is_empty() {
            self.add_error("channel_id", "channel_id is required and cannot be empty");
        }
        if config.max_message_size == 0 {
            self.add_error("max_message_size", "max_message_size must be at least 1");
        }
        if config.default_timeout <= 0.0 {
            self.add_error("default_timeout", "default_timeout must be positive");
        }
        if config.enable_validation && config.manifest_path.is_none() {
            self.add_error(
                "manifest_path",
                "manifest_path is required when enable_validation is set",
            );
        }

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    fn add_error(&mut self, path: &str, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.into(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.into(),
            severity: Severity::Warning,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_server() -> ServerConfig {
        ServerConfig {
            bind_path: "/tmp/dgipc.sock".to_string(),
            max_connections: 10,
            default_timeout: 5.0,
            max_message_size: 1024,
            cleanup_on_start: true,
            cleanup_on_shutdown: true,
            debug_logging: false,
            manifest_path: None,
            metrics_port: None,
            log_format: crate::observability::logging::LogFormat::default(),
        }
    }

    #[test]
    fn minimal_server_config_is_valid() {
        let mut validator = Validator::new();
        let result = validator.validate_server(&minimal_server());
        assert!(result.is_valid());
    }

    #[test]
    fn empty_bind_path_is_an_error() {
        let mut config = minimal_server();
        config.bind_path = String::new();
        let mut validator = Validator::new();
        let result = validator.validate_server(&config);
        assert!(result.has_errors());
    }

    #[test]
    fn zero_max_connections_is_an_error() {
        let mut config = minimal_server();
        config.max_connections = 0;
        let mut validator = Validator::new();
        let result = validator.validate_server(&config);
        assert!(
            result
                .errors
                .iter()
                .any(|e| e.path == "max_connections")
        );
    }

    #[test]
    fn validation_enabled_without_manifest_path_is_an_error() {
        let config = ClientConfig {
            socket_path: "/tmp/dgipc.sock".to_string(),
            channel_id: "ui".to_string(),
            max_message_size: 1024,
            default_timeout: 5.0,
            enable_validation: true,
            manifest_path: None,
        };
        let mut validator = Validator::new();
        let result = validator.validate_client(&config);
        assert!(result.has_errors());
    }
}
