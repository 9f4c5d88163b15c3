//! # mikro-client
//!
//! Typed client for the Mikrocloud control panel API.
//!
//! This crate provides:
//!
//! - [`ApiClient`] - HTTP client holding the base URL and session
//! - [`api::auth`] - login, registration, logout and profile
//! - [`api::applications`] - application CRUD and deploy/stop
//! - [`api::deployments`] - deployment history, redeploy, cancel, logs
//! - [`api::databases`] - managed databases, engine defaults, start/stop, logs
//! - [`LogStreamReader`] - cancellable line-by-line log streaming
//! - [`SharedSession`] / [`SessionStore`] - explicit, optionally persisted credentials
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   REST (JSON, bearer)   ┌─────────────────────┐
//! │  ApiClient   │◄───────────────────────►│  mikrocloud  /api   │
//! │  ├ session   │                         │                     │
//! │  └ logs ─────┼── streamed GET .../logs ─►                     │
//! └──────────────┘                         └─────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use mikro_client::{ApiClient, ClientConfig, LoginRequest, SharedSession};
//!
//! # async fn example() -> mikro_client::Result<()> {
//! let client = ApiClient::new(&ClientConfig::default(), SharedSession::new())?;
//! client
//!     .auth()
//!     .login(&LoginRequest::new("admin@example.com", "password"))
//!     .await?;
//!
//! let handle = client.databases().stream_logs(
//!     "project-id",
//!     "database-id",
//!     true,
//!     |line| println!("{line}"),
//!     |err| eprintln!("log stream failed: {err}"),
//! );
//! handle.cancel();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod logs;
pub mod session;

// Re-export main types
pub use api::ActionResponse;
pub use api::applications::{
    Application, ApplicationStatus, Buildpack, CreateApplicationRequest, DeployAction,
    DeploymentSource, SourceKind, UpdateApplicationRequest,
};
pub use api::auth::{AuthResponse, LoginRequest, RegisterRequest, SetupStatus, User};
pub use api::databases::{
    CreateDatabaseRequest, Database, DatabaseAction, DatabaseConfig, DatabaseStatus, DatabaseType,
};
pub use api::deployments::{Deployment, DeploymentStatus};
pub use client::ApiClient;
pub use config::{ClientConfig, DEFAULT_BASE_URL, default_config_path, default_session_path};
pub use error::{ClientError, Result, StreamError};
pub use logs::{
    CancelGate, LineDecoder, LogStreamReader, LogStreamRequest, StreamCanceller, StreamHandle,
    StreamOutcome, StreamState, pump_lines,
};
pub use session::{Session, SessionStore, SharedSession};
