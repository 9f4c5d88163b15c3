//! Authentication command implementation.
//!
//! Handles login, registration, logout and session inspection.

use std::io::Write;

use mikro_client::{ApiClient, LoginRequest, RegisterRequest};

use crate::cli::AuthCommands;
use crate::error::CliError;
use crate::output::{Message, OutputFormat, SessionStatus};

/// Handler for auth subcommands.
pub struct AuthCommand<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthCommand<'a> {
    /// Creates a new auth command handler.
    #[must_use]
    pub const fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Executes the auth subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &AuthCommands,
    ) -> Result<(), CliError> {
        let auth = self.client.auth();
        match command {
            AuthCommands::Login { email, password } => {
                let response = auth.login(&LoginRequest::new(email, password)).await?;
                format.write(
                    out,
                    &Message::new(format!("Logged in as {}", response.user.email)),
                )
            }
            AuthCommands::Register {
                name,
                email,
                password,
            } => {
                let request = RegisterRequest {
                    name: name.clone(),
                    email: email.clone(),
                    password: password.clone(),
                };
                let response = auth.register(&request).await?;
                format.write(
                    out,
                    &Message::new(format!("Registered and logged in as {}", response.user.email)),
                )
            }
            AuthCommands::Logout => {
                let was_logged_in = auth.is_authenticated();
                auth.logout().await?;
                let message = if was_logged_in {
                    "Logged out"
                } else {
                    "Not logged in"
                };
                format.write(out, &Message::new(message))
            }
            AuthCommands::Whoami => format.write(out, &auth.profile().await?),
            AuthCommands::Status => format.write(out, &self.session_status()),
            AuthCommands::Setup => format.write(out, &auth.setup_status().await?),
        }
    }

    fn session_status(&self) -> SessionStatus {
        let session = self.client.session().current();
        SessionStatus {
            api_url: self.client.base_url().to_string(),
            authenticated: session.is_some(),
            email: session
                .as_ref()
                .and_then(|s| s.user.as_ref())
                .map(|u| u.email.clone()),
            issued_at: session.map(|s| s.issued_at),
        }
    }
}
