//! Logs command implementation.
//!
//! Prints deployment or database logs line by line as they arrive. With
//! `--follow` the stream stays open until the server closes it or the user
//! presses Ctrl-C, which cancels the stream and exits cleanly.

use std::future::Future;
use std::io::Write;

use mikro_client::{ApiClient, StreamError, StreamHandle, StreamOutcome};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cli::LogsCommands;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Stream callbacks run on the reader task; events carry them to the writer.
#[derive(Debug)]
enum LogEvent {
    Line(String),
    Failed(StreamError),
}

#[derive(Serialize)]
struct JsonLine<'a> {
    line: &'a str,
}

/// Handler for the logs command.
pub struct LogsCommand<'a> {
    client: &'a ApiClient,
}

impl<'a> LogsCommand<'a> {
    /// Creates a new logs command handler.
    #[must_use]
    pub const fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Executes the logs command, stopping early on Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns error if the stream fails or output cannot be written.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &LogsCommands,
    ) -> Result<(), CliError> {
        self.execute_until(out, format, command, ctrl_c()).await
    }

    /// Executes the logs command, cancelling the stream once `shutdown`
    /// resolves. Lines already delivered stay printed.
    ///
    /// # Errors
    ///
    /// Returns error if the stream fails or output cannot be written.
    pub async fn execute_until<W, F>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &LogsCommands,
        shutdown: F,
    ) -> Result<(), CliError>
    where
        W: Write,
        F: Future<Output = ()>,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = self.start(command, tx);
        let canceller = handle.canceller();

        tokio::pin!(shutdown);
        let mut interrupted = false;

        // Ends once the reader task drops both callbacks.
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(LogEvent::Line(line)) => write_line(out, format, &line)?,
                    Some(LogEvent::Failed(err)) => return Err(err.into()),
                    None => break,
                },
                () = &mut shutdown, if !interrupted => {
                    debug!("interrupted, cancelling log stream");
                    interrupted = true;
                    canceller.cancel();
                }
            }
        }

        match handle.join().await {
            StreamOutcome::Failed(err) => Err(err.into()),
            StreamOutcome::Completed | StreamOutcome::Cancelled => Ok(()),
        }
    }

    fn start(&self, command: &LogsCommands, tx: mpsc::UnboundedSender<LogEvent>) -> StreamHandle {
        let errors = tx.clone();
        let on_line = move |line: String| {
            let _ = tx.send(LogEvent::Line(line));
        };
        let on_error = move |err: StreamError| {
            let _ = errors.send(LogEvent::Failed(err));
        };

        match command {
            LogsCommands::Deployment {
                project,
                app,
                id,
                follow,
            } => self.client.deployments().stream_logs(
                &project.project,
                app,
                id,
                *follow,
                on_line,
                on_error,
            ),
            LogsCommands::Database {
                project,
                id,
                follow,
            } => self
                .client
                .databases()
                .stream_logs(&project.project, id, *follow, on_line, on_error),
        }
    }
}

/// Print one line: raw text, or one JSON object per line.
fn write_line<W: Write>(out: &mut W, format: &OutputFormat, line: &str) -> Result<(), CliError> {
    if format.is_json() {
        serde_json::to_writer(&mut *out, &JsonLine { line })
            .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
        writeln!(out)?;
    } else {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
