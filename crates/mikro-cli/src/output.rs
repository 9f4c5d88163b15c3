//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use chrono::{DateTime, Utc};
use mikro_client::{
    ActionResponse, Application, Database, DatabaseConfig, DatabaseType, Deployment, SetupStatus,
    User,
};
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Confirmation for commands without a resource to show.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// What happened.
    pub message: String,
}

impl Message {
    /// Wrap `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl TableDisplay for Message {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{}", self.message)?;
        Ok(())
    }
}

/// Locally stored session, as shown by `auth status`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// API the session belongs to.
    pub api_url: String,
    /// Whether a token is stored.
    pub authenticated: bool,
    /// Email of the logged-in user, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// When the session was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
}

impl TableDisplay for SessionStatus {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "API:            {}", self.api_url)?;
        if !self.authenticated {
            writeln!(writer, "Status:         not logged in")?;
            return Ok(());
        }
        writeln!(writer, "Status:         logged in")?;
        if let Some(email) = &self.email {
            writeln!(writer, "User:           {email}")?;
        }
        if let Some(issued_at) = &self.issued_at {
            writeln!(writer, "Since:          {}", timestamp(issued_at))?;
        }
        Ok(())
    }
}

impl TableDisplay for User {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Name:           {}", self.name)?;
        writeln!(writer, "Email:          {}", self.email)?;
        if !self.role.is_empty() {
            writeln!(writer, "Role:           {}", self.role)?;
        }
        writeln!(writer, "ID:             {}", self.id)?;
        Ok(())
    }
}

impl TableDisplay for SetupStatus {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.setup_required {
            writeln!(writer, "Setup required: register the first admin account")?;
        } else {
            writeln!(writer, "Setup complete")?;
        }
        Ok(())
    }
}

impl TableDisplay for ActionResponse {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.message.is_empty() {
            writeln!(writer, "{}: accepted", self.action)?;
        } else {
            writeln!(writer, "{}", self.message)?;
        }
        Ok(())
    }
}

impl TableDisplay for Vec<Application> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No applications in project")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<36}  {:<20}  {:<10}  {:<30}  {:<16}",
            "ID", "NAME", "STATUS", "DOMAIN", "CREATED"
        )?;
        writeln!(writer, "{}", "─".repeat(120))?;

        for app in self {
            writeln!(
                writer,
                "{:<36}  {:<20}  {:<10}  {:<30}  {:<16}",
                app.id,
                truncate(&app.name, 20),
                app.status.to_string(),
                truncate(or_dash(&app.domain), 30),
                timestamp(&app.created_at)
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} application(s)", self.len())?;
        Ok(())
    }
}

impl TableDisplay for Application {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Application: {}", self.name)?;
        writeln!(writer, "══════════════════════════════════════════════════")?;
        writeln!(writer, "  ID:             {}", self.id)?;
        writeln!(writer, "  Status:         {}", self.status)?;
        writeln!(writer, "  Domain:         {}", or_dash(&self.domain))?;
        writeln!(writer, "  Project:        {}", self.project_id)?;
        writeln!(writer, "  Environment:    {}", self.environment_id)?;
        writeln!(writer, "  Created:        {}", timestamp(&self.created_at))?;
        if !self.description.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "{}", self.description)?;
        }
        Ok(())
    }
}

impl TableDisplay for Vec<Deployment> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No deployments yet")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<36}  {:<10}  {:<8}  {:<16}  {:<16}  {:>8}",
            "ID", "STATUS", "COMMIT", "BRANCH", "STARTED", "DURATION"
        )?;
        writeln!(writer, "{}", "─".repeat(104))?;

        for deployment in self {
            writeln!(
                writer,
                "{:<36}  {:<10}  {:<8}  {:<16}  {:<16}  {:>8}",
                deployment.id,
                deployment.status.to_string(),
                or_dash(deployment.short_hash()),
                truncate(or_dash(&deployment.branch), 16),
                timestamp(&deployment.started_at),
                deployment
                    .duration
                    .map_or_else(|| "-".to_string(), |secs| format!("{secs}s"))
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} deployment(s)", self.len())?;
        Ok(())
    }
}

impl TableDisplay for Deployment {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Deployment: {}", self.id)?;
        writeln!(writer, "══════════════════════════════════════════════════")?;
        writeln!(writer, "  Status:         {}", self.status)?;
        writeln!(writer, "  Application:    {}", self.application_id)?;
        writeln!(writer, "  Commit:         {}", or_dash(self.short_hash()))?;
        if !self.commit_message.is_empty() {
            writeln!(writer, "  Message:        {}", self.commit_message)?;
        }
        writeln!(writer, "  Branch:         {}", or_dash(&self.branch))?;
        writeln!(writer, "  Author:         {}", or_dash(&self.author))?;
        writeln!(writer, "  Started:        {}", timestamp(&self.started_at))?;
        if let Some(done) = &self.completed_at {
            writeln!(writer, "  Completed:      {}", timestamp(done))?;
        }
        if let Some(secs) = self.duration {
            writeln!(writer, "  Duration:       {secs}s")?;
        }
        Ok(())
    }
}

impl TableDisplay for Vec<Database> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No databases in project")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<36}  {:<20}  {:<10}  {:<12}  {:<16}",
            "ID", "NAME", "TYPE", "STATUS", "ENVIRONMENT"
        )?;
        writeln!(writer, "{}", "─".repeat(102))?;

        for db in self {
            writeln!(
                writer,
                "{:<36}  {:<20}  {:<10}  {:<12}  {:<16}",
                db.id,
                truncate(&db.name, 20),
                db.kind.to_string(),
                db.status.to_string(),
                truncate(&db.environment_id, 16)
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} database(s)", self.len())?;
        Ok(())
    }
}

impl TableDisplay for Database {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Database: {}", self.name)?;
        writeln!(writer, "══════════════════════════════════════════════════")?;
        writeln!(writer, "  ID:             {}", self.id)?;
        writeln!(writer, "  Type:           {}", self.kind)?;
        writeln!(writer, "  Status:         {}", self.status)?;
        writeln!(writer, "  Environment:    {}", self.environment_id)?;
        if !self.connection_string.is_empty() {
            writeln!(writer, "  Connection:     {}", self.connection_string)?;
        }
        for (name, port) in &self.ports {
            writeln!(writer, "  Port:           {port} ({name})")?;
        }
        writeln!(writer, "  Created:        {}", timestamp(&self.created_at))?;
        Ok(())
    }
}

impl TableDisplay for Vec<DatabaseType> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        for kind in self {
            writeln!(writer, "{kind}")?;
        }
        Ok(())
    }
}

impl TableDisplay for DatabaseConfig {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Engine:         {}", self.kind)?;
        if let Some(port) = self.port() {
            writeln!(writer, "Port:           {port}")?;
        }
        writeln!(writer)?;
        serde_json::to_writer_pretty(&mut *writer, self)
            .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
        writeln!(writer)?;
        Ok(())
    }
}

fn timestamp(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M").to_string()
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}

/// Truncate to `max_len` characters, marking the cut with `...`.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
