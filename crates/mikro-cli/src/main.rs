//! Mikrocloud CLI binary entrypoint.
//!
//! This is the main entry point for the `mikro` command-line tool.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mikro_cli::cli::Cli;
use mikro_cli::commands;
use mikro_cli::output::OutputFormat;
use mikro_client::{ApiClient, SessionStore, SharedSession};

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), mikro_cli::CliError> {
    let config = cli.load_config()?;
    let session = SharedSession::persistent(SessionStore::new(config.session_path()));
    let client = ApiClient::new(&config, session)?;

    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();
    commands::dispatch(&client, &mut stdout, &format, &cli.command).await
}
