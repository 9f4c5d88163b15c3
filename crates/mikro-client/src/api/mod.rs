//! Typed endpoint groups.
//!
//! Each group borrows an [`ApiClient`](crate::ApiClient) and maps its methods
//! one-to-one onto backend routes below `/api`.

pub mod applications;
pub mod auth;
pub mod databases;
pub mod deployments;

use serde::{Deserialize, Serialize};

/// Acknowledgement returned by action endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Server message.
    #[serde(default)]
    pub message: String,
    /// The action that was performed.
    #[serde(default)]
    pub action: String,
}
