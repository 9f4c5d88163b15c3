//! Deployment command implementation.

use std::io::Write;

use mikro_client::ApiClient;

use crate::cli::DeploymentsCommands;
use crate::error::CliError;
use crate::output::{Message, OutputFormat};

/// Handler for deployment subcommands.
pub struct DeploymentsCommand<'a> {
    client: &'a ApiClient,
}

impl<'a> DeploymentsCommand<'a> {
    /// Creates a new deployment command handler.
    #[must_use]
    pub const fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Executes the deployment subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the API call fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &DeploymentsCommands,
    ) -> Result<(), CliError> {
        let deployments = self.client.deployments();
        match command {
            DeploymentsCommands::List { project, app } => {
                format.write(out, &deployments.list(&project.project, app).await?)
            }
            DeploymentsCommands::Get { project, app, id } => {
                format.write(out, &deployments.get(&project.project, app, id).await?)
            }
            DeploymentsCommands::Redeploy { project, app, id } => {
                let started = deployments.redeploy(&project.project, app, id).await?;
                format.write(out, &started)
            }
            DeploymentsCommands::Cancel { project, app, id } => {
                deployments.cancel(&project.project, app, id).await?;
                format.write(out, &Message::new(format!("Deployment {id} cancelled")))
            }
            DeploymentsCommands::Stop { project, app, id } => {
                deployments.stop(&project.project, app, id).await?;
                format.write(out, &Message::new(format!("Deployment {id} stopped")))
            }
        }
    }
}
