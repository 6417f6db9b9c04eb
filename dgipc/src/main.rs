//! `dgipc` command-line entry point.

use clap::Parser;
use dgipc::cli::args::Cli;
use dgipc::cli::commands::dispatch;
use dgipc::observability::{LogFormat, init_logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        init_logging(LogFormat::Human, cli.verbose);
    }

    if let Err(err) = dispatch(cli).await {
        eprintln!("dgipc: {err}");
        std::process::exit(1);
    }
}
