//! Authentication endpoints.
//!
//! Login and registration issue a [`Session`] into the client's
//! [`SharedSession`]; logout clears it.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::error::{ClientError, Result};
use crate::session::Session;

/// A control panel user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Role, e.g. `admin`.
    #[serde(default)]
    pub role: String,
}

/// Credentials for `POST /auth/login`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Login email.
    pub email: String,
    /// Password.
    pub password: String,
}

impl LoginRequest {
    /// Credentials for `email`.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// New account for `POST /auth/register`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Password.
    pub password: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful login or registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// The authenticated user.
    pub user: User,
}

/// Answer of `GET /auth/setup`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetupStatus {
    /// Whether the first admin account still has to be created.
    #[serde(default, alias = "needs_setup")]
    pub setup_required: bool,
    /// Any other fields the server reports.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Authentication endpoints, borrowed from [`ApiClient::auth`].
#[derive(Debug, Clone, Copy)]
pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Log in and store the issued session.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse> {
        let url = self.client.url(&["auth", "login"]);
        let response: AuthResponse = self.client.post(url, credentials).await?;
        self.issue(&response)?;
        info!(user = %response.user.email, "logged in");
        Ok(response)
    }

    /// Create an account and store the issued session.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        let url = self.client.url(&["auth", "register"]);
        let response: AuthResponse = self.client.post(url, request).await?;
        self.issue(&response)?;
        info!(user = %response.user.email, "registered");
        Ok(response)
    }

    /// Revoke the session server-side and clear it locally.
    ///
    /// The server call is best effort: the local session is cleared even if
    /// it fails.
    pub async fn logout(&self) -> Result<()> {
        if self.client.session().is_authenticated() {
            let url = self.client.url(&["auth", "logout"]);
            if let Err(e) = self
                .client
                .post_empty(url, &serde_json::json!({}))
                .await
            {
                warn!(error = %e, "server-side logout failed");
            }
        }
        self.client.session().clear()?;
        info!("logged out");
        Ok(())
    }

    /// Profile of the logged-in user.
    pub async fn profile(&self) -> Result<User> {
        if !self.is_authenticated() {
            return Err(ClientError::Unauthenticated);
        }
        self.client.get(self.client.url(&["auth", "profile"])).await
    }

    /// Whether the install still needs its first account.
    pub async fn setup_status(&self) -> Result<SetupStatus> {
        self.client.get(self.client.url(&["auth", "setup"])).await
    }

    /// Current bearer token, if logged in.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.client.session().token()
    }

    /// Whether a session is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.client.session().is_authenticated()
    }

    fn issue(&self, response: &AuthResponse) -> Result<()> {
        let session = Session::from_token(&response.token).with_user(response.user.clone());
        self.client.session().issue(session)
    }
}
