//! Deployment endpoints below
//! `/projects/{project_id}/applications/{application_id}/deployments`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::ApiClient;
use crate::error::{Result, StreamError};
use crate::logs::StreamHandle;

/// Status of a single deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Queued.
    Pending,
    /// Building the image.
    Building,
    /// Rolling out.
    Deploying,
    /// Finished successfully.
    Success,
    /// Finished with an error.
    Failed,
    /// Cancelled before finishing.
    Cancelled,
    /// Status not known to this client.
    #[serde(other)]
    Unknown,
}

impl DeploymentStatus {
    /// Whether the deployment has finished, one way or another.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Building => write!(f, "building"),
            Self::Deploying => write!(f, "deploying"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One deployment of an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Deployment ID.
    pub id: String,
    /// Deployed application.
    pub application_id: String,
    /// Current status.
    pub status: DeploymentStatus,
    /// Deployed commit.
    #[serde(default)]
    pub commit_hash: String,
    /// Commit subject line.
    #[serde(default)]
    pub commit_message: String,
    /// Source branch.
    #[serde(default)]
    pub branch: String,
    /// Commit author.
    #[serde(default)]
    pub author: String,
    /// When the deployment started.
    pub started_at: DateTime<Utc>,
    /// When the deployment finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Captured build log, when included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
}

impl Deployment {
    /// Abbreviated commit hash.
    #[must_use]
    pub fn short_hash(&self) -> &str {
        self.commit_hash
            .char_indices()
            .nth(7)
            .map_or(self.commit_hash.as_str(), |(i, _)| &self.commit_hash[..i])
    }
}

#[derive(Deserialize)]
struct DeploymentsResponse {
    deployments: Vec<Deployment>,
}

/// Deployment endpoints, borrowed from [`ApiClient::deployments`].
#[derive(Debug, Clone, Copy)]
pub struct DeploymentsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> DeploymentsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    fn url(&self, project_id: &str, application_id: &str, rest: &[&str]) -> url::Url {
        let mut segments = vec![
            "projects",
            project_id,
            "applications",
            application_id,
            "deployments",
        ];
        segments.extend_from_slice(rest);
        self.client.url(&segments)
    }

    /// All deployments of an application, newest first as the server orders
    /// them.
    pub async fn list(&self, project_id: &str, application_id: &str) -> Result<Vec<Deployment>> {
        let url = self.url(project_id, application_id, &[]);
        let response: DeploymentsResponse = self.client.get(url).await?;
        Ok(response.deployments)
    }

    /// One deployment.
    pub async fn get(
        &self,
        project_id: &str,
        application_id: &str,
        deployment_id: &str,
    ) -> Result<Deployment> {
        let url = self.url(project_id, application_id, &[deployment_id]);
        self.client.get(url).await
    }

    /// Run a deployment again. Returns the new deployment.
    pub async fn redeploy(
        &self,
        project_id: &str,
        application_id: &str,
        deployment_id: &str,
    ) -> Result<Deployment> {
        let url = self.url(project_id, application_id, &[deployment_id, "redeploy"]);
        let deployment: Deployment = self.client.post(url, &serde_json::json!({})).await?;
        info!(deployment = %deployment.id, from = %deployment_id, "redeploy started");
        Ok(deployment)
    }

    /// Cancel a deployment that has not finished.
    pub async fn cancel(
        &self,
        project_id: &str,
        application_id: &str,
        deployment_id: &str,
    ) -> Result<()> {
        let url = self.url(project_id, application_id, &[deployment_id, "cancel"]);
        self.client.post_empty(url, &serde_json::json!({})).await?;
        info!(deployment = %deployment_id, "deployment cancelled");
        Ok(())
    }

    /// Stop the containers of a deployment.
    pub async fn stop(
        &self,
        project_id: &str,
        application_id: &str,
        deployment_id: &str,
    ) -> Result<()> {
        let url = self.url(project_id, application_id, &[deployment_id, "stop"]);
        self.client.post_empty(url, &serde_json::json!({})).await?;
        info!(deployment = %deployment_id, "deployment stopped");
        Ok(())
    }

    /// Stream the build and runtime log of a deployment.
    ///
    /// With `follow` the stream stays open for new output until cancelled.
    /// Must be called inside a tokio runtime.
    pub fn stream_logs<L, E>(
        &self,
        project_id: &str,
        application_id: &str,
        deployment_id: &str,
        follow: bool,
        on_line: L,
        on_error: E,
    ) -> StreamHandle
    where
        L: FnMut(String) + Send + 'static,
        E: FnOnce(StreamError) + Send + 'static,
    {
        let url = self.url(project_id, application_id, &[deployment_id, "logs"]);
        self.client.stream_logs(url, follow, on_line, on_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "id": "d1",
            "application_id": "a1",
            "status": "building",
            "commit_hash": "0123456789abcdef",
            "commit_message": "fix login",
            "branch": "main",
            "author": "ada",
            "started_at": "2024-05-01T12:00:00Z"
        })
    }

    #[test]
    fn test_deployment_decodes_without_optional_fields() {
        let deployment: Deployment = serde_json::from_value(sample_json()).expect("decode");
        assert_eq!(deployment.status, DeploymentStatus::Building);
        assert_eq!(deployment.completed_at, None);
        assert_eq!(deployment.duration, None);
        assert_eq!(deployment.short_hash(), "0123456");
    }

    #[test]
    fn test_deployment_decodes_finished() {
        let mut json = sample_json();
        json["status"] = serde_json::json!("success");
        json["completed_at"] = serde_json::json!("2024-05-01T12:03:00Z");
        json["duration"] = serde_json::json!(180);
        let deployment: Deployment = serde_json::from_value(json).expect("decode");
        assert!(deployment.status.is_finished());
        assert_eq!(deployment.duration, Some(180));
    }

    #[test]
    fn test_short_hash_of_short_commit() {
        let mut json = sample_json();
        json["commit_hash"] = serde_json::json!("abc");
        let deployment: Deployment = serde_json::from_value(json).expect("decode");
        assert_eq!(deployment.short_hash(), "abc");
    }

    #[test]
    fn test_status_display_matches_wire() {
        for status in [
            DeploymentStatus::Pending,
            DeploymentStatus::Building,
            DeploymentStatus::Deploying,
            DeploymentStatus::Success,
            DeploymentStatus::Failed,
            DeploymentStatus::Cancelled,
        ] {
            let wire = serde_json::to_value(status).expect("encode");
            assert_eq!(wire, serde_json::json!(status.to_string()));
        }
    }
}
