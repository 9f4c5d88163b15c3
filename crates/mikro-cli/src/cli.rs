//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use mikro_client::{ClientConfig, DatabaseType, default_config_path};

use crate::error::CliError;

/// Mikrocloud CLI - manage applications and databases on a Mikrocloud server.
#[derive(Parser, Debug, Clone)]
#[command(name = "mikro")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// API base URL, e.g. `https://cloud.example.com/api`. Overrides the config file.
    #[arg(short = 'u', long, env = "MIKRO_API_URL")]
    pub api_url: Option<String>,

    /// Config file to read instead of the default location.
    #[arg(short, long, env = "MIKRO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Log requests and stream state changes to stderr.
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Resolve the client configuration.
    ///
    /// An explicit `--config` file must exist; the default config file is
    /// optional. `--api-url` wins over either.
    pub fn load_config(&self) -> Result<ClientConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => {
                let path = default_config_path();
                if path.is_file() {
                    ClientConfig::from_file(&path)?
                } else {
                    ClientConfig::default()
                }
            }
        };

        if let Some(url) = &self.api_url {
            config.base_url.clone_from(url);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Log in, log out and inspect the session.
    Auth {
        /// Auth subcommand to execute.
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Application management.
    #[command(alias = "app")]
    Apps {
        /// Application subcommand to execute.
        #[command(subcommand)]
        command: AppsCommands,
    },

    /// Deployment history and control.
    #[command(alias = "deploy")]
    Deployments {
        /// Deployment subcommand to execute.
        #[command(subcommand)]
        command: DeploymentsCommands,
    },

    /// Managed databases.
    #[command(alias = "db")]
    Databases {
        /// Database subcommand to execute.
        #[command(subcommand)]
        command: DatabasesCommands,
    },

    /// Print deployment or database logs.
    Logs {
        /// Log source.
        #[command(subcommand)]
        command: LogsCommands,
    },
}

/// Auth subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum AuthCommands {
    /// Log in and store the session.
    Login {
        /// Account email.
        email: String,

        /// Account password.
        #[arg(long, env = "MIKRO_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and store the session.
    Register {
        /// Display name.
        name: String,

        /// Account email.
        email: String,

        /// Account password.
        #[arg(long, env = "MIKRO_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Revoke the session and forget it locally.
    Logout,

    /// Show the logged-in user as reported by the server.
    Whoami,

    /// Show the locally stored session without contacting the server.
    Status,

    /// Show whether the server still needs its first admin account.
    Setup,
}

/// Project selector shared by resource commands.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ProjectArgs {
    /// Project ID.
    #[arg(short, long, env = "MIKRO_PROJECT")]
    pub project: String,
}

/// Application subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum AppsCommands {
    /// List applications in a project.
    List {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Show one application.
    Get {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,

        /// Application ID.
        id: String,
    },

    /// Create an application.
    Create(CreateAppArgs),

    /// Change settings of an application.
    Update(UpdateAppArgs),

    /// Delete an application.
    Delete {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,

        /// Application ID.
        id: String,
    },

    /// Start a new deployment.
    Deploy {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,

        /// Application ID.
        id: String,
    },

    /// Stop a running application.
    Stop {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,

        /// Application ID.
        id: String,
    },
}

/// Arguments for `apps create`.
#[derive(Args, Debug, Clone)]
#[command(group = clap::ArgGroup::new("source").required(true).args(["git", "image"]))]
pub struct CreateAppArgs {
    /// Target project.
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Application name.
    pub name: String,

    /// Target environment ID.
    #[arg(short, long)]
    pub environment: String,

    /// Free-form description.
    #[arg(short, long)]
    pub description: Option<String>,

    /// Git repository to build from.
    #[arg(long)]
    pub git: Option<String>,

    /// Branch to build when using `--git`.
    #[arg(long, default_value = "main", requires = "git")]
    pub branch: String,

    /// Docker image to run.
    #[arg(long)]
    pub image: Option<String>,

    /// Image tag when using `--image`.
    #[arg(long, default_value = "latest", requires = "image")]
    pub tag: String,

    /// Build strategy.
    #[arg(long, default_value = "nixpacks")]
    pub buildpack: String,

    /// Environment variables (KEY=VALUE).
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env_vars: Vec<String>,
}

/// Arguments for `apps update`.
#[derive(Args, Debug, Clone)]
pub struct UpdateAppArgs {
    /// Target project.
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Application ID.
    pub id: String,

    /// New description.
    #[arg(short, long)]
    pub description: Option<String>,

    /// New public domain.
    #[arg(long)]
    pub domain: Option<String>,

    /// Deploy on every push.
    #[arg(long)]
    pub auto_deploy: Option<bool>,

    /// Replace environment variables (KEY=VALUE).
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env_vars: Vec<String>,
}

/// Deployment subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum DeploymentsCommands {
    /// List deployments of an application, newest first.
    List {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,

        /// Application ID.
        app: String,
    },

    /// Show one deployment.
    Get {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,

        /// Application ID.
        app: String,

        /// Deployment ID.
        id: String,
    },

    /// Deploy the same source again.
    Redeploy {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,

        /// Application ID.
        app: String,

        /// Deployment ID.
        id: String,
    },

    /// Abort a deployment that is still building.
    Cancel {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,

        /// Application ID.
        app: String,

        /// Deployment ID.
        id: String,
    },

    /// Stop the containers of a deployment.
    Stop {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,

        /// Application ID.
        app: String,

        /// Deployment ID.
        id: String,
    },
}

/// Database subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum DatabasesCommands {
    /// List databases in a project.
    List {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,

        /// Only show databases in this environment.
        #[arg(short, long)]
        environment: Option<String>,
    },

    /// Show one database.
    Get {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,

        /// Database ID.
        id: String,
    },

    /// Create a database with the server's default engine settings.
    Create {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,

        /// Database name.
        name: String,

        /// Engine, e.g. `postgresql` or `redis`.
        #[arg(short = 't', long = "type")]
        kind: DatabaseType,

        /// Target environment ID.
        #[arg(short, long)]
        environment: String,

        /// Free-form description.
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a database.
    Delete {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,

        /// Database ID.
        id: String,
    },

    /// List the engines the server can provision.
    Types {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Show the default configuration of an engine.
    Config {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,

        /// Engine.
        kind: DatabaseType,
    },

    /// Start a stopped database.
    Start {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,

        /// Database ID.
        id: String,
    },

    /// Stop a running database.
    Stop {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,

        /// Database ID.
        id: String,
    },
}

/// Log sources.
#[derive(Subcommand, Debug, Clone)]
pub enum LogsCommands {
    /// Build and runtime logs of a deployment.
    Deployment {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,

        /// Application ID.
        app: String,

        /// Deployment ID.
        id: String,

        /// Keep printing new lines until interrupted.
        #[arg(short, long)]
        follow: bool,
    },

    /// Container logs of a database.
    Database {
        /// Target project.
        #[command(flatten)]
        project: ProjectArgs,

        /// Database ID.
        id: String,

        /// Keep printing new lines until interrupted.
        #[arg(short, long)]
        follow: bool,
    },
}
