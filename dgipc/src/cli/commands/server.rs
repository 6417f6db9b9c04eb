//! `server run` and `server validate` command handlers (spec §6).

use crate::cli::args::{OutputFormat, ServerRunArgs, ServerValidateArgs};
use crate::config;
use crate::error::Error;
use crate::server::DatagramServer;

/// Load a server configuration, bind its socket, and serve requests until
/// interrupted with Ctrl-C.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or validated, or
/// if the server fails to bind its socket.
pub async fn run(args: &ServerRunArgs) -> Result<(), Error> {
    let (mut server_config, validation) = config::load_server_config(&args.config)?;
    for warning in &validation.warnings {
        tracing::warn!("{warning}");
    }

    if let Some(ref bind) = args.bind {
        server_config.bind_path.clone_from(bind);
    }

    let manifest = match server_config.manifest_path.as_deref() {
        Some(path) => {
            let manifest = config::load_manifest(std::path::Path::new(path))?;
            let validator = dgipc_core::ManifestValidator::new(manifest)
                .map_err(|e| Error::Config(crate::error::ConfigError::Manifest(e)))?;
            Some(validator)
        }
        None => None,
    };

    let mut server = DatagramServer::new(server_config.clone());
    if let Some(manifest) = manifest {
        server = server.with_manifest(manifest);
    }

    if args.format == OutputFormat::Human {
        println!("starting dgipc server on {}", server_config.bind_path);
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    tokio::select! {
        result = server.start_listening() => result,
        _ = &mut ctrl_c => {
            server.stop();
            Ok(())
        }
    }
}

/// Validate one or more server configuration files without running a
/// server, printing a per-file report.
///
/// # Errors
///
/// Returns an error if any file fails validation (or carries warnings when
/// `--strict` is set); in that case the per-file report has already been
/// printed.
pub fn validate(args: &ServerValidateArgs) -> Result<(), Error> {
    let mut results = Vec::new();
    let mut invalid_count = 0usize;

    for path in &args.files {
        match config::load_server_config(path) {
            Ok((_, validation)) => {
                let warnings: Vec<String> =
                    validation.warnings.iter().map(ToString::to_string).collect();
                let strict_failure = args.strict && !warnings.is_empty();
                if strict_failure {
                    invalid_count += 1;
                }
                results.push(serde_json::json!({
                    "path": path.display().to_string(),
                    "valid": !strict_failure,
                    "warnings": warnings,
                }));
            }
            Err(e) => {
                invalid_count += 1;
                results.push(serde_json::json!({
                    "path": path.display().to_string(),
                    "valid": false,
                    "error": e.to_string(),
                    "warnings": [],
                }));
            }
        }
    }

    match args.format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "files": results,
                "summary": {
                    "total": args.files.len(),
                    "valid": args.files.len() - invalid_count,
                    "invalid": invalid_count,
                }
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Human => {
            for result in &results {
                let path = result["path"].as_str().unwrap_or_default();
                if result["valid"].as_bool().unwrap_or(false) {
                    println!("{path}: OK");
                } else if let Some(error) = result["error"].as_str() {
                    println!("{path}: FAILED ({error})");
                } else {
                    println!("{path}: FAILED (strict mode: warnings present)");
                }
                if let Some(warnings) = result["warnings"].as_array() {
                    for warning in warnings {
                        if let Some(w) = warning.as_str() {
                            println!("  warning: {w}");
                        }
                    }
                }
            }
        }
    }

    if invalid_count > 0 {
        return Err(Error::Config(crate::error::ConfigError::Invalid(format!(
            "{invalid_count} of {} file(s) failed validation",
            args.files.len()
        ))));
    }

    Ok(())
}
