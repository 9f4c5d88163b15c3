//! Application endpoints below `/projects/{project_id}/applications`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ActionResponse;
use crate::client::ApiClient;
use crate::error::Result;

/// Lifecycle status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    /// Created, never deployed.
    Pending,
    /// Serving traffic.
    Running,
    /// Stopped by a user.
    Stopped,
    /// Last deployment failed.
    Failed,
    /// A deployment is in progress.
    Deploying,
    /// Status not known to this client.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
            Self::Deploying => write!(f, "deploying"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// An application as listed by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// Application ID.
    pub id: String,
    /// Name, unique within the project.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Owning project.
    pub project_id: String,
    /// Environment the application runs in.
    pub environment_id: String,
    /// Public domain, empty until assigned.
    #[serde(default)]
    pub domain: String,
    /// Current status.
    pub status: ApplicationStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Where an application's code comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A git repository.
    Git,
    /// A prebuilt container image.
    Docker,
}

/// Source block of a create or update request.
///
/// `config` is passed through verbatim; its shape depends on `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSource {
    /// Source kind.
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// Kind-specific settings.
    #[serde(default)]
    pub config: serde_json::Value,
}

impl DeploymentSource {
    /// Build from the `branch` of the git repository at `url`.
    pub fn git(url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Git,
            config: serde_json::json!({ "url": url.into(), "branch": branch.into() }),
        }
    }

    /// Run the container `image` at `tag`.
    pub fn docker(image: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Docker,
            config: serde_json::json!({ "image": image.into(), "tag": tag.into() }),
        }
    }
}

/// Build settings of a create or update request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buildpack {
    /// Buildpack name, e.g. `nixpacks` or `dockerfile`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Buildpack-specific settings.
    #[serde(default)]
    pub config: serde_json::Value,
}

impl Buildpack {
    /// Buildpack `kind` with no extra settings.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            config: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// Body of `POST /projects/{p}/applications`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateApplicationRequest {
    /// Name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Target environment.
    pub environment_id: String,
    /// Code source.
    pub deployment_source: DeploymentSource,
    /// Build settings.
    pub buildpack: Buildpack,
    /// Environment variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_vars: Option<BTreeMap<String, String>>,
}

/// Body of `PUT /projects/{p}/applications/{a}`. Unset fields are left as
/// they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateApplicationRequest {
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New code source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_source: Option<DeploymentSource>,
    /// New public domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// New build settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buildpack: Option<Buildpack>,
    /// Replacement environment variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_vars: Option<BTreeMap<String, String>>,
    /// Whether pushes trigger deployments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_deploy: Option<bool>,
}

/// Action for `POST .../deploy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployAction {
    /// Start a new deployment.
    Deploy,
    /// Stop the running application.
    Stop,
}

#[derive(Serialize)]
struct DeployBody {
    action: DeployAction,
}

#[derive(Deserialize)]
struct ApplicationsResponse {
    applications: Vec<Application>,
}

/// Application endpoints, borrowed from [`ApiClient::applications`].
#[derive(Debug, Clone, Copy)]
pub struct ApplicationsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> ApplicationsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// All applications of a project.
    pub async fn list(&self, project_id: &str) -> Result<Vec<Application>> {
        let url = self.client.url(&["projects", project_id, "applications"]);
        let response: ApplicationsResponse = self.client.get(url).await?;
        Ok(response.applications)
    }

    /// One application.
    pub async fn get(&self, project_id: &str, application_id: &str) -> Result<Application> {
        let url = self
            .client
            .url(&["projects", project_id, "applications", application_id]);
        self.client.get(url).await
    }

    /// Create an application.
    pub async fn create(
        &self,
        project_id: &str,
        request: &CreateApplicationRequest,
    ) -> Result<Application> {
        let url = self.client.url(&["projects", project_id, "applications"]);
        let application: Application = self.client.post(url, request).await?;
        info!(application = %application.id, name = %application.name, "application created");
        Ok(application)
    }

    /// Update an application.
    pub async fn update(
        &self,
        project_id: &str,
        application_id: &str,
        request: &UpdateApplicationRequest,
    ) -> Result<Application> {
        let url = self
            .client
            .url(&["projects", project_id, "applications", application_id]);
        self.client.put(url, request).await
    }

    /// Delete an application.
    pub async fn delete(&self, project_id: &str, application_id: &str) -> Result<()> {
        let url = self
            .client
            .url(&["projects", project_id, "applications", application_id]);
        self.client.delete(url).await?;
        info!(application = %application_id, "application deleted");
        Ok(())
    }

    /// Start a deployment or stop the application.
    pub async fn deploy(
        &self,
        project_id: &str,
        application_id: &str,
        action: DeployAction,
    ) -> Result<ActionResponse> {
        let url = self.client.url(&[
            "projects",
            project_id,
            "applications",
            application_id,
            "deploy",
        ]);
        self.client.post(url, &DeployBody { action }).await
    }
}
