//! # mikro-cli
//!
//! Mikrocloud command-line interface.
//!
//! Provides commands for:
//! - Logging in and inspecting the stored session
//! - Application, deployment and database management
//! - Following deployment and database logs
//!
//! # Architecture
//!
//! Every command borrows one [`mikro_client::ApiClient`]. The session it
//! carries is file-backed, so a `mikro auth login` is picked up by later
//! invocations.
//!
//! ```text
//! ┌───────────┐      REST + log streams      ┌──────────────────┐
//! │   mikro   │◄────────────────────────────►│  mikrocloud /api │
//! └───────────┘         (HTTP, bearer)       └──────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format};
pub use error::CliError;
pub use output::OutputFormat;
