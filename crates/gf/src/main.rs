use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod dispatch;
mod output;

use cli::Cli;
use commands::{CommandContext, CommandError};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let ctx = CommandContext::from_cli(&cli);
    match dispatch::dispatch(&cli, &ctx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                eprintln!("{}", error_json(&e));
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

/// Installs the stderr log subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `--verbose` logs at debug,
/// `--quiet` at error and the default is warn.
fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(cli)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .with_target(false)
        .try_init();
}

fn default_log_level(cli: &Cli) -> &'static str {
    if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    }
}

/// Renders an error as the JSON envelope printed under `--json`.
fn error_json(e: &CommandError) -> String {
    let error = serde_json::json!({
        "error": {
            "code": e.code(),
            "message": e.to_string(),
        }
    });
    serde_json::to_string_pretty(&error).unwrap_or_else(|_| error.to_string())
}
