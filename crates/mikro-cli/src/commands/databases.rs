//! Database command implementation.

use std::io::Write;

use mikro_client::{ApiClient, CreateDatabaseRequest, DatabaseAction};
use tracing::debug;

use crate::cli::DatabasesCommands;
use crate::error::CliError;
use crate::output::{Message, OutputFormat};

/// Handler for database subcommands.
pub struct DatabasesCommand<'a> {
    client: &'a ApiClient,
}

impl<'a> DatabasesCommand<'a> {
    /// Creates a new database command handler.
    #[must_use]
    pub const fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Executes the database subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the API call fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &DatabasesCommands,
    ) -> Result<(), CliError> {
        let databases = self.client.databases();
        match command {
            DatabasesCommands::List {
                project,
                environment,
            } => format.write(
                out,
                &databases
                    .list(&project.project, environment.as_deref())
                    .await?,
            ),
            DatabasesCommands::Get { project, id } => {
                format.write(out, &databases.get(&project.project, id).await?)
            }
            DatabasesCommands::Create {
                project,
                name,
                kind,
                environment,
                description,
            } => {
                debug!(project = %project.project, %name, %kind, "creating database");
                let request = CreateDatabaseRequest {
                    name: name.clone(),
                    description: description.clone(),
                    kind: *kind,
                    environment_id: environment.clone(),
                    config: None,
                };
                format.write(out, &databases.create(&project.project, &request).await?)
            }
            DatabasesCommands::Delete { project, id } => {
                databases.delete(&project.project, id).await?;
                format.write(out, &Message::new(format!("Database {id} deleted")))
            }
            DatabasesCommands::Types { project } => {
                format.write(out, &databases.types(&project.project).await?)
            }
            DatabasesCommands::Config { project, kind } => format.write(
                out,
                &databases.default_config(&project.project, *kind).await?,
            ),
            DatabasesCommands::Start { project, id } => format.write(
                out,
                &databases
                    .action(&project.project, id, DatabaseAction::Start)
                    .await?,
            ),
            DatabasesCommands::Stop { project, id } => format.write(
                out,
                &databases
                    .action(&project.project, id, DatabaseAction::Stop)
                    .await?,
            ),
        }
    }
}
