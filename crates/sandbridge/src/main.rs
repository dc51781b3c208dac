mod cmd;
mod exit;
mod logging;
mod output;
mod values;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "sandbridge", version, about = "Controller/worker IPC bridge CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "sandbridge",
            "send",
            "/tmp/cache/socket",
            "--kind",
            "script-message",
            "--data",
            "hello",
        ])
        .expect("send args should parse");

        assert!(matches!(cli.command, Command::Send(_)));
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "sandbridge",
            "send",
            "/tmp/cache/socket",
            "--json",
            "[1]",
            "--data",
            "hello",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_listen_subcommand() {
        let cli = Cli::try_parse_from([
            "sandbridge",
            "listen",
            "/tmp/cache",
            "--count",
            "3",
            "--kinds",
            "script-message,content-ready",
        ])
        .expect("listen args should parse");

        match cli.command {
            Command::Listen(args) => {
                assert_eq!(args.count, Some(3));
                assert_eq!(
                    args.kinds.as_deref(),
                    Some(&["script-message".to_string(), "content-ready".to_string()][..])
                );
            }
            other => panic!("expected listen, got {other:?}"),
        }
    }

    #[test]
    fn parses_worker_call_subcommand() {
        let cli = Cli::try_parse_from([
            "sandbridge",
            "worker",
            "/tmp/cache/socket",
            "--call",
            "echo",
            "--args",
            "[1, \"x\"]",
        ])
        .expect("worker args should parse");

        assert!(matches!(cli.command, Command::Worker(_)));
    }
}
