//! `client send` command handler (spec §6).

use std::collections::HashMap;
use std::time::Duration;

use crate::cli::args::{ClientSendArgs, OutputFormat};
use crate::client::{ClientOptions, DatagramClient};
use crate::error::Error;

/// Send a single request to a running server and print its response.
///
/// # Errors
///
/// Returns an error if `--args` is not valid JSON, the client cannot be
/// constructed, or the request fails (method not found, timeout, framing,
/// socket I/O).
pub async fn send(args: &ClientSendArgs) -> Result<(), Error> {
    let parsed_args: Option<HashMap<String, serde_json::Value>> = match &args.args {
        Some(raw) => Some(serde_json::from_str(raw)?),
        None => None,
    };

    let options = ClientOptions {
        channel_id: args.channel_id.clone(),
        ..ClientOptions::default()
    };
    let client = DatagramClient::new(args.socket.clone(), options)?;

    let timeout = args.timeout.map(Duration::from_secs_f64);
    let response = client.send(&args.request, parsed_args, timeout).await?;

    match args.format {
        OutputFormat::Human => {
            if response.success {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&response.result).unwrap_or_default()
                );
            } else if let Some(error) = &response.error {
                println!("error {}: {}", error.code, error.message);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    if !response.success {
        let message = response
            .error
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_default();
        return Err(Error::Config(crate::error::ConfigError::Invalid(message)));
    }

    Ok(())
}
