//! Fake Mikrocloud API server for integration tests.
//!
//! Spins up a minimal `axum` HTTP server on a random TCP port bound to
//! 127.0.0.1 and serves canned responses for every route the client uses.
//! Every request is recorded, and everything outside the public auth
//! routes requires `Authorization: Bearer <TOKEN>`.
//!
//! Log routes:
//! - `GET .../deployments/{id}/logs` returns a fixed body in several chunks
//!   (`broken` answers 500, `empty` answers 204)
//! - `GET .../databases/{id}/logs` streams whatever is pushed through
//!   [`FakeMikroApi::live_log`] (`broken` answers 500)

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::channel::mpsc;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Token the fake server accepts.
pub const TOKEN: &str = "tok-ada";

/// Password the fake server accepts on login.
pub const PASSWORD: &str = "correct horse";

/// Lines of the fixed deployment log, as the client should deliver them.
pub const DEPLOYMENT_LOG_LINES: [&str; 4] = [
    "building image",
    "step 1/3 done",
    "snow \u{2603} man",
    "final line without newline",
];

type LogChunk = Result<Bytes, std::io::Error>;

/// A request seen by the fake server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Default)]
struct ApiState {
    requests: Vec<RecordedRequest>,
    live_log: Option<mpsc::UnboundedReceiver<LogChunk>>,
}

type SharedState = Arc<Mutex<ApiState>>;

/// Sending side of a live database log.
pub struct LiveLog {
    tx: mpsc::UnboundedSender<LogChunk>,
}

impl LiveLog {
    /// Push a raw chunk to the client. Returns `false` once the server side
    /// has gone away.
    pub fn push(&self, chunk: impl Into<Bytes>) -> bool {
        self.tx.unbounded_send(Ok(chunk.into())).is_ok()
    }

    /// End the body normally.
    pub fn close(self) {
        self.tx.close_channel();
    }
}

/// Handle to the running fake API server.
pub struct FakeMikroApi {
    addr: SocketAddr,
    state: SharedState,
}

impl FakeMikroApi {
    /// Start the server on a random port. Returns once it is listening.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = SharedState::default();

        let deployment = "/api/projects/{project}/applications/{app}/deployments/{deployment}";
        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/api/auth/logout", post(empty_object))
            .route("/api/auth/profile", get(profile))
            .route("/api/auth/setup", get(setup))
            .route(
                "/api/projects/{project}/applications",
                get(list_applications).post(create_application),
            )
            .route(
                "/api/projects/{project}/applications/{app}",
                get(get_application)
                    .put(update_application)
                    .delete(no_content),
            )
            .route(
                "/api/projects/{project}/applications/{app}/deploy",
                post(action_ack),
            )
            .route(
                "/api/projects/{project}/applications/{app}/deployments",
                get(list_deployments),
            )
            .route(deployment, get(get_deployment))
            .route(&format!("{deployment}/redeploy"), post(redeploy))
            .route(&format!("{deployment}/cancel"), post(empty_ok))
            .route(&format!("{deployment}/stop"), post(stop_deployment))
            .route(&format!("{deployment}/logs"), get(deployment_logs))
            .route(
                "/api/projects/{project}/databases",
                get(list_databases).post(create_database),
            )
            .route("/api/projects/{project}/databases/types", get(database_types))
            .route(
                "/api/projects/{project}/databases/types/{kind}/config",
                get(default_config),
            )
            .route(
                "/api/projects/{project}/databases/{db}",
                get(get_database).delete(no_content),
            )
            .route(
                "/api/projects/{project}/databases/{db}/action",
                post(action_ack),
            )
            .route(
                "/api/projects/{project}/databases/{db}/logs",
                get(database_logs),
            )
            .layer(middleware::from_fn_with_state(
                state.clone(),
                record_and_authorize,
            ))
            .with_state(state.clone());

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { addr, state })
    }

    /// API base URL including the `/api` prefix.
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// The most recent request to `path`.
    pub fn last_request_to(&self, path: &str) -> Option<RecordedRequest> {
        self.state
            .lock()
            .requests
            .iter()
            .rev()
            .find(|r| r.path == path)
            .cloned()
    }

    /// Feed the body of the next database log request.
    pub fn live_log(&self) -> LiveLog {
        let (tx, rx) = mpsc::unbounded();
        self.state.lock().live_log = Some(rx);
        LiveLog { tx }
    }
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

async fn record_and_authorize(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    state.lock().requests.push(RecordedRequest {
        method: request.method().to_string(),
        path: path.clone(),
        query: request.uri().query().map(str::to_string),
        authorization: authorization.clone(),
    });

    let public = matches!(
        path.as_str(),
        "/api/auth/login" | "/api/auth/register" | "/api/auth/setup"
    );
    if !public && authorization != Some(format!("Bearer {TOKEN}")) {
        return error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid token",
        );
    }
    next.run(request).await
}

fn error(status: StatusCode, code: &str, message: &str) -> Response {
    (status, Json(json!({"error": code, "message": message}))).into_response()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn user_json(name: &str, email: &str) -> Value {
    json!({"id": "u1", "name": name, "email": email, "role": "admin"})
}

fn application_json(project: &str, id: &str, name: &str, status: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": "",
        "project_id": project,
        "environment_id": "e1",
        "domain": "",
        "status": status,
        "created_at": "2024-05-01T12:00:00Z"
    })
}

fn deployment_json(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "application_id": "a1",
        "status": status,
        "commit_hash": "0123456789abcdef",
        "commit_message": "fix login",
        "branch": "main",
        "author": "ada",
        "started_at": "2024-05-01T12:00:00Z"
    })
}

fn database_json(project: &str, id: &str, name: &str, kind: &str, environment: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": "",
        "type": kind,
        "project_id": project,
        "environment_id": environment,
        "status": "running",
        "config": {"type": kind},
        "connection_string": format!("{kind}://{name}"),
        "ports": {},
        "created_at": "2024-05-01T12:00:00Z",
        "updated_at": "2024-05-01T12:00:00Z"
    })
}

// ---------------------------------------------------------------------------
// Auth handlers
// ---------------------------------------------------------------------------

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] != PASSWORD {
        return error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "Invalid email or password",
        );
    }
    let email = body["email"].as_str().unwrap_or_default();
    Json(json!({"token": TOKEN, "user": user_json("Ada", email)})).into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    let name = body["name"].as_str().unwrap_or_default();
    let email = body["email"].as_str().unwrap_or_default();
    (
        StatusCode::CREATED,
        Json(json!({"token": TOKEN, "user": user_json(name, email)})),
    )
        .into_response()
}

async fn profile() -> Json<Value> {
    Json(user_json("Ada", "ada@example.com"))
}

async fn setup() -> Json<Value> {
    Json(json!({"setup_required": false, "user_count": 1}))
}

// ---------------------------------------------------------------------------
// Generic handlers
// ---------------------------------------------------------------------------

async fn empty_object() -> Json<Value> {
    Json(json!({}))
}

async fn empty_ok() -> StatusCode {
    StatusCode::OK
}

async fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn action_ack(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "message": "Action completed successfully",
        "action": body["action"]
    }))
}

// ---------------------------------------------------------------------------
// Application and deployment handlers
// ---------------------------------------------------------------------------

async fn list_applications(Path(project): Path<String>) -> Json<Value> {
    Json(json!({
        "applications": [
            application_json(&project, "a1", "web", "running"),
            application_json(&project, "a2", "worker", "stopped"),
        ]
    }))
}

async fn get_application(Path((project, app)): Path<(String, String)>) -> Response {
    if app == "missing" {
        return error(
            StatusCode::NOT_FOUND,
            "application_not_found",
            "Application not found",
        );
    }
    Json(application_json(&project, &app, "web", "running")).into_response()
}

async fn create_application(Path(project): Path<String>, Json(body): Json<Value>) -> Response {
    let name = body["name"].as_str().unwrap_or_default();
    (
        StatusCode::CREATED,
        Json(application_json(&project, "a3", name, "pending")),
    )
        .into_response()
}

async fn update_application(
    Path((project, app)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut updated = application_json(&project, &app, "web", "running");
    if let Some(domain) = body.get("domain") {
        updated["domain"] = domain.clone();
    }
    Json(updated)
}

async fn list_deployments() -> Json<Value> {
    Json(json!({
        "deployments": [
            deployment_json("d2", "building"),
            deployment_json("d1", "success"),
        ]
    }))
}

async fn get_deployment(
    Path((_project, _app, deployment)): Path<(String, String, String)>,
) -> Json<Value> {
    Json(deployment_json(&deployment, "success"))
}

async fn redeploy() -> Json<Value> {
    Json(deployment_json("d3", "pending"))
}

async fn stop_deployment() -> Json<Value> {
    Json(json!({"message": "deployment stopped"}))
}

async fn deployment_logs(
    Path((_project, _app, deployment)): Path<(String, String, String)>,
) -> Response {
    match deployment.as_str() {
        "broken" => error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "log backend unavailable",
        ),
        "empty" => StatusCode::NO_CONTENT.into_response(),
        _ => {
            let chunks: Vec<LogChunk> = vec![
                Ok(Bytes::from_static(b"building image\nstep 1/3")),
                Ok(Bytes::from_static(b" done\n\n")),
                Ok(Bytes::from_static(b"snow \xE2\x98")),
                Ok(Bytes::from_static(b"\x83 man\r\n")),
                Ok(Bytes::from_static(b"final line without newline")),
            ];
            Body::from_stream(futures::stream::iter(chunks)).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Database handlers
// ---------------------------------------------------------------------------

async fn list_databases(
    Path(project): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let environment = params.get("environment_id").map_or("e1", String::as_str);
    Json(json!({
        "databases": [database_json(&project, "db1", "main", "postgresql", environment)]
    }))
}

async fn create_database(Path(project): Path<String>, Json(body): Json<Value>) -> Response {
    let name = body["name"].as_str().unwrap_or_default();
    let kind = body["type"].as_str().unwrap_or_default();
    let environment = body["environment_id"].as_str().unwrap_or_default();
    (
        StatusCode::CREATED,
        Json(database_json(&project, "db2", name, kind, environment)),
    )
        .into_response()
}

async fn get_database(Path((project, db)): Path<(String, String)>) -> Response {
    if db == "missing" {
        return error(StatusCode::NOT_FOUND, "database_not_found", "Database not found");
    }
    Json(database_json(&project, &db, "main", "postgresql", "e1")).into_response()
}

async fn database_types() -> Json<Value> {
    Json(json!({"types": ["postgresql", "redis", "mongodb"]}))
}

async fn default_config(Path((_project, kind)): Path<(String, String)>) -> Json<Value> {
    if kind == "postgresql" {
        Json(json!({
            "type": "postgresql",
            "postgresql": {
                "version": "16",
                "database_name": "app",
                "username": "app",
                "password": "generated",
                "port": 5432
            }
        }))
    } else {
        Json(json!({"type": kind}))
    }
}

async fn database_logs(
    State(state): State<SharedState>,
    Path((_project, db)): Path<(String, String)>,
) -> Response {
    if db == "broken" {
        return error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "container not found",
        );
    }
    let live = state.lock().live_log.take();
    match live {
        Some(rx) => Body::from_stream(rx).into_response(),
        None => StatusCode::OK.into_response(),
    }
}
