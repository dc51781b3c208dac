use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod listen;
pub mod send;
pub mod version;
pub mod worker;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a controller: accept workers and print received messages.
    Listen(ListenArgs),
    /// Run a worker: connect, announce readiness, and answer calls.
    Worker(WorkerArgs),
    /// Connect as a worker, send a single message, and exit.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Worker(args) => worker::run(args, format),
        Command::Send(args) => send::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Cache directory to place the rendezvous socket in.
    pub cache_dir: PathBuf,
    /// Filter to specific message kinds (comma-separated protocol names).
    #[arg(long, value_delimiter = ',')]
    pub kinds: Option<Vec<String>>,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Expose a built-in echo function to each worker under this name.
    #[arg(long, value_name = "NAME")]
    pub register: Option<String>,
}

#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Rendezvous socket path to connect to.
    pub path: PathBuf,
    /// Wait for a function registered under this name, call it once,
    /// print the result, and exit.
    #[arg(long, value_name = "NAME")]
    pub call: Option<String>,
    /// JSON array of arguments for --call.
    #[arg(long, default_value = "[]")]
    pub args: String,
    /// Target context id for --call.
    #[arg(long, default_value = "0")]
    pub context: u64,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Rendezvous socket path to connect to.
    pub path: PathBuf,
    /// Message kind to send (protocol name).
    #[arg(long, short = 'k', default_value = "script-message")]
    pub kind: String,
    /// JSON array payload.
    #[arg(long, conflicts_with = "data")]
    pub json: Option<String>,
    /// Raw string payload (sent as a one-string value sequence).
    #[arg(long, conflicts_with = "json")]
    pub data: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
