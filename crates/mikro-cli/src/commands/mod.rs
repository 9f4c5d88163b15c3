//! CLI command implementations.
//!
//! Each submodule implements one command group:
//! - [`auth`] - Login, registration and session inspection
//! - [`apps`] - Application management
//! - [`deployments`] - Deployment history and control
//! - [`databases`] - Managed databases
//! - [`logs`] - Deployment and database log streaming

use std::collections::BTreeMap;
use std::io::Write;

use mikro_client::ApiClient;

use crate::cli::Commands;
use crate::error::CliError;
use crate::output::OutputFormat;

pub mod apps;
pub mod auth;
pub mod databases;
pub mod deployments;
pub mod logs;

pub use apps::AppsCommand;
pub use auth::AuthCommand;
pub use databases::DatabasesCommand;
pub use deployments::DeploymentsCommand;
pub use logs::LogsCommand;

/// Run `command` against `client`, writing results to `out`.
///
/// # Errors
///
/// Returns the first API, stream or output error.
pub async fn dispatch<W: Write>(
    client: &ApiClient,
    out: &mut W,
    format: &OutputFormat,
    command: &Commands,
) -> Result<(), CliError> {
    match command {
        Commands::Auth { command } => AuthCommand::new(client).execute(out, format, command).await,
        Commands::Apps { command } => AppsCommand::new(client).execute(out, format, command).await,
        Commands::Deployments { command } => {
            DeploymentsCommand::new(client)
                .execute(out, format, command)
                .await
        }
        Commands::Databases { command } => {
            DatabasesCommand::new(client)
                .execute(out, format, command)
                .await
        }
        Commands::Logs { command } => LogsCommand::new(client).execute(out, format, command).await,
    }
}

/// Parse repeated `KEY=VALUE` arguments.
pub(crate) fn parse_env_vars(pairs: &[String]) -> Result<BTreeMap<String, String>, CliError> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(CliError::InvalidArgument(format!(
                "expected KEY=VALUE, got '{pair}'"
            ))),
        })
        .collect()
}
