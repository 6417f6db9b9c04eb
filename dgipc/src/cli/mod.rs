//! Command-line interface: argument definitions and command dispatch
//! (spec §6 "External Interfaces").

pub mod args;
pub mod commands;

pub use args::Cli;
pub use commands::dispatch;
