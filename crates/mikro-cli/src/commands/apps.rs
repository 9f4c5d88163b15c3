//! Application command implementation.

use std::io::Write;

use mikro_client::{
    ApiClient, Buildpack, CreateApplicationRequest, DeployAction, DeploymentSource,
    UpdateApplicationRequest,
};
use tracing::debug;

use super::parse_env_vars;
use crate::cli::{AppsCommands, CreateAppArgs, UpdateAppArgs};
use crate::error::CliError;
use crate::output::{Message, OutputFormat};

/// Handler for application subcommands.
pub struct AppsCommand<'a> {
    client: &'a ApiClient,
}

impl<'a> AppsCommand<'a> {
    /// Creates a new application command handler.
    #[must_use]
    pub const fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Executes the application subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the arguments are invalid or the API call fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &AppsCommands,
    ) -> Result<(), CliError> {
        let apps = self.client.applications();
        match command {
            AppsCommands::List { project } => format.write(out, &apps.list(&project.project).await?),
            AppsCommands::Get { project, id } => {
                format.write(out, &apps.get(&project.project, id).await?)
            }
            AppsCommands::Create(args) => {
                let request = create_request(args)?;
                debug!(project = %args.project.project, name = %request.name, "creating application");
                format.write(out, &apps.create(&args.project.project, &request).await?)
            }
            AppsCommands::Update(args) => {
                let request = update_request(args)?;
                format.write(
                    out,
                    &apps.update(&args.project.project, &args.id, &request).await?,
                )
            }
            AppsCommands::Delete { project, id } => {
                apps.delete(&project.project, id).await?;
                format.write(out, &Message::new(format!("Application {id} deleted")))
            }
            AppsCommands::Deploy { project, id } => format.write(
                out,
                &apps.deploy(&project.project, id, DeployAction::Deploy).await?,
            ),
            AppsCommands::Stop { project, id } => format.write(
                out,
                &apps.deploy(&project.project, id, DeployAction::Stop).await?,
            ),
        }
    }
}

fn create_request(args: &CreateAppArgs) -> Result<CreateApplicationRequest, CliError> {
    let deployment_source = match (&args.git, &args.image) {
        (Some(repo), None) => DeploymentSource::git(repo, &args.branch),
        (None, Some(image)) => DeploymentSource::docker(image, &args.tag),
        _ => {
            return Err(CliError::InvalidArgument(
                "exactly one of --git or --image is required".into(),
            ));
        }
    };

    let env_vars = if args.env_vars.is_empty() {
        None
    } else {
        Some(parse_env_vars(&args.env_vars)?)
    };

    Ok(CreateApplicationRequest {
        name: args.name.clone(),
        description: args.description.clone(),
        environment_id: args.environment.clone(),
        deployment_source,
        buildpack: Buildpack::new(&args.buildpack),
        env_vars,
    })
}

fn update_request(args: &UpdateAppArgs) -> Result<UpdateApplicationRequest, CliError> {
    let env_vars = if args.env_vars.is_empty() {
        None
    } else {
        Some(parse_env_vars(&args.env_vars)?)
    };

    let request = UpdateApplicationRequest {
        description: args.description.clone(),
        domain: args.domain.clone(),
        auto_deploy: args.auto_deploy,
        env_vars,
        ..UpdateApplicationRequest::default()
    };

    if request == UpdateApplicationRequest::default() {
        return Err(CliError::InvalidArgument("nothing to update".into()));
    }
    Ok(request)
}
