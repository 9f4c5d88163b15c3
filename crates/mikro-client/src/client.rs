//! HTTP client for the Mikrocloud control panel API.
//!
//! [`ApiClient`] owns the HTTP connection pool, the API base URL and the
//! [`SharedSession`] whose token is attached to every request. The typed
//! endpoint groups borrow it:
//!
//! ```rust,no_run
//! use mikro_client::{ApiClient, ClientConfig, SharedSession};
//!
//! # async fn example() -> mikro_client::Result<()> {
//! let client = ApiClient::new(&ClientConfig::default(), SharedSession::new())?;
//! let apps = client.applications().list("project-id").await?;
//! println!("{} applications", apps.len());
//! # Ok(())
//! # }
//! ```

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

use crate::api::applications::ApplicationsApi;
use crate::api::auth::AuthApi;
use crate::api::databases::DatabasesApi;
use crate::api::deployments::DeploymentsApi;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result, StreamError};
use crate::logs::{LogStreamReader, LogStreamRequest, StreamHandle};
use crate::session::SharedSession;

/// Longest raw error body echoed back in an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Client for the Mikrocloud REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    logs: LogStreamReader,
    base_url: Url,
    session: SharedSession,
}

impl ApiClient {
    /// Build a client from `config`, authenticating with `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &ClientConfig, session: SharedSession) -> Result<Self> {
        config.validate()?;

        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "base_url '{}' cannot carry a path",
                config.base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        let logs = LogStreamReader::new(config)?;

        debug!(base_url = %base_url, authenticated = session.is_authenticated(), "API client ready");
        Ok(Self {
            http,
            logs,
            base_url,
            session,
        })
    }

    /// Client for `base_url` with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid http(s) URL.
    pub fn with_base_url(base_url: &str, session: SharedSession) -> Result<Self> {
        Self::new(&ClientConfig::with_base_url(base_url), session)
    }

    /// The API base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The session used to authenticate requests.
    #[must_use]
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Login, registration and profile endpoints.
    #[must_use]
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    /// Application endpoints.
    #[must_use]
    pub fn applications(&self) -> ApplicationsApi<'_> {
        ApplicationsApi::new(self)
    }

    /// Deployment endpoints.
    #[must_use]
    pub fn deployments(&self) -> DeploymentsApi<'_> {
        DeploymentsApi::new(self)
    }

    /// Managed database endpoints.
    #[must_use]
    pub fn databases(&self) -> DatabasesApi<'_> {
        DatabasesApi::new(self)
    }

    // ========================================================================
    // Request plumbing
    // ========================================================================

    /// Resolve `segments` below the base URL. Segments are percent-encoded.
    pub(crate) fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match self.session.bearer() {
            Some(bearer) => builder.header(reqwest::header::AUTHORIZATION, bearer),
            None => builder,
        }
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.send(self.request(Method::GET, url)).await
    }

    pub(crate) async fn post<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::POST, url).json(body)).await
    }

    /// POST whose response body, if any, is discarded.
    pub(crate) async fn post_empty<B>(&self, url: Url, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        self.send_empty(self.request(Method::POST, url).json(body))
            .await
    }

    pub(crate) async fn put<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::PUT, url).json(body)).await
    }

    pub(crate) async fn delete(&self, url: Url) -> Result<()> {
        self.send_empty(self.request(Method::DELETE, url)).await
    }

    /// Open a log stream at `url` with the current session's credentials.
    pub(crate) fn stream_logs<L, E>(&self, url: Url, follow: bool, on_line: L, on_error: E) -> StreamHandle
    where
        L: FnMut(String) + Send + 'static,
        E: FnOnce(StreamError) + Send + 'static,
    {
        let mut request = LogStreamRequest::new(url, follow);
        if let Some(bearer) = self.session.bearer() {
            request = request.with_authorization(bearer);
        }
        self.logs.start(request, on_line, on_error)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let body = self.execute(builder).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<()> {
        self.execute(builder).await.map(drop)
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<bytes::Bytes> {
        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().clone();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = error_message(status, &String::from_utf8_lossy(&body));
            debug!(url = %url, %status, message = %message, "API request failed");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        trace!(url = %url, %status, bytes = body.len(), "API response");
        Ok(body)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Human-readable message for a failed response.
///
/// Prefers the JSON `message` field, then `error`, `detail` and `title`,
/// then the raw body, then the status reason.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        let found = [parsed.message, parsed.error, parsed.detail, parsed.title]
            .into_iter()
            .flatten()
            .find(|m| !m.trim().is_empty());
        if let Some(message) = found {
            return message;
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && !trimmed.starts_with('{') {
        return trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    }

    status
        .canonical_reason()
        .map_or_else(|| status.as_str().to_string(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use test_case::test_case;

    fn client(base: &str) -> ApiClient {
        ApiClient::with_base_url(base, SharedSession::new()).expect("client")
    }

    #[test_case("http://localhost:3000/api", &["auth", "login"], "http://localhost:3000/api/auth/login" ; "plain base")]
    #[test_case("http://localhost:3000/api/", &["auth", "login"], "http://localhost:3000/api/auth/login" ; "trailing slash")]
    #[test_case("https://cloud.example.com", &["projects", "p1"], "https://cloud.example.com/projects/p1" ; "no prefix")]
    #[test_case("http://h/api", &["projects", "a b/c"], "http://h/api/projects/a%20b%2Fc" ; "segments are encoded")]
    fn test_url_building(base: &str, segments: &[&str], expected: &str) {
        assert_eq!(client(base).url(segments).as_str(), expected);
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = ApiClient::with_base_url("not a url", SharedSession::new())
            .expect_err("must reject");
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_session_is_shared_with_caller() {
        let session = SharedSession::new();
        let client = ApiClient::with_base_url("http://h/api", session.clone()).expect("client");
        session.issue(Session::from_token("t")).expect("issue");
        assert!(client.session().is_authenticated());
    }

    #[test_case(r#"{"error":"not_found","message":"Application not found"}"#, "Application not found" ; "message wins")]
    #[test_case(r#"{"error":"invalid_json"}"#, "invalid_json" ; "error code only")]
    #[test_case(r#"{"title":"Not Implemented","detail":"later"}"#, "later" ; "problem details")]
    #[test_case("upstream exploded", "upstream exploded" ; "plain text body")]
    #[test_case("", "Bad Gateway" ; "empty body falls back to reason")]
    #[test_case(r#"{"message":"  "}"#, "Bad Gateway" ; "blank message ignored")]
    fn test_error_message(body: &str, expected: &str) {
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, body), expected);
    }

    #[test]
    fn test_error_message_truncates_long_bodies() {
        let body = "x".repeat(1000);
        let message = error_message(StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert_eq!(message.len(), MAX_ERROR_BODY_CHARS);
    }
}
