//! CLI command dispatch and handlers (spec §6 "External Interfaces").
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod client;
pub mod completions;
pub mod server;
pub mod version;

use crate::cli::args::{Cli, ClientSubcommand, Commands, ServerSubcommand};
use crate::error::Error;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Commands::Server(ServerSubcommand::Run(args)) => server::run(&args).await,
        Commands::Server(ServerSubcommand::Validate(args)) => server::validate(&args),
        Commands::Client(cmd) => match cmd.subcommand {
            ClientSubcommand::Send(args) => client::send(&args).await,
        },
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}
