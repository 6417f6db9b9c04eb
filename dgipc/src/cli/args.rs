//! Command-line argument definitions (spec §6 "External Interfaces").

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Request/response IPC framework over Unix-domain datagram sockets.
#[derive(Debug, Parser)]
#[command(name = "dgipc", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase logging verbosity; repeatable (-v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run or validate a server configuration.
    #[command(subcommand)]
    Server(ServerSubcommand),

    /// Send a single request to a running server.
    Client(ClientCommand),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Print version and build information.
    Version(VersionArgs),
}

/// `dgipc server <subcommand>`.
#[derive(Debug, Subcommand)]
pub enum ServerSubcommand {
    /// Run a server, binding its socket and serving requests until
    /// interrupted.
    Run(ServerRunArgs),

    /// Validate one or more server configuration files without running
    /// anything.
    Validate(ServerValidateArgs),
}

/// `dgipc server run`.
#[derive(Debug, Parser)]
pub struct ServerRunArgs {
    /// Path to a server configuration file (YAML or JSON).
    #[arg(long)]
    pub config: PathBuf,

    /// Overrides the configuration's `bind_path`.
    #[arg(long)]
    pub bind: Option<String>,

    /// Output format for startup and shutdown messages.
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// `dgipc server validate`.
#[derive(Debug, Parser)]
pub struct ServerValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format for the validation report.
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Treat warnings as errors (nonzero exit if any warning is present).
    #[arg(long)]
    pub strict: bool,
}

/// `dgipc client send`.
#[derive(Debug, Parser)]
pub struct ClientCommand {
    #[command(subcommand)]
    pub subcommand: ClientSubcommand,
}

/// `dgipc client <subcommand>`.
#[derive(Debug, Subcommand)]
pub enum ClientSubcommand {
    /// Send a single request and print the response.
    Send(ClientSendArgs),
}

/// `dgipc client send`.
#[derive(Debug, Parser)]
pub struct ClientSendArgs {
    /// Path of the server's Unix-domain socket.
    #[arg(long)]
    pub socket: String,

    /// Request name to send.
    pub request: String,

    /// Request arguments as a JSON object.
    #[arg(long)]
    pub args: Option<String>,

    /// Seconds to wait for a reply before giving up.
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Logical routing tag attached to the request.
    #[arg(long, default_value = "")]
    pub channel_id: String,

    /// Output format for the response.
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// `dgipc completions`.
#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate a completion script for.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// `dgipc version`.
#[derive(Debug, Parser)]
pub struct VersionArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Output rendering for commands that print structured results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    Human,
    /// Machine-readable JSON.
    Json,
}

/// Shell targets for completion script generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash.
    Bash,
    /// Zsh.
    Zsh,
    /// Fish.
    Fish,
    /// PowerShell.
    PowerShell,
    /// Elvish.
    Elvish,
}
