//! Managed database endpoints below `/projects/{project_id}/databases`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ActionResponse;
use crate::client::ApiClient;
use crate::error::{Result, StreamError};
use crate::logs::StreamHandle;

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// PostgreSQL.
    Postgresql,
    /// MySQL.
    Mysql,
    /// MariaDB.
    Mariadb,
    /// Redis.
    Redis,
    /// KeyDB.
    Keydb,
    /// Dragonfly.
    Dragonfly,
    /// MongoDB.
    Mongodb,
    /// ClickHouse.
    Clickhouse,
}

impl DatabaseType {
    /// Every engine, in wire order.
    pub const ALL: [Self; 8] = [
        Self::Postgresql,
        Self::Mysql,
        Self::Mariadb,
        Self::Redis,
        Self::Keydb,
        Self::Dragonfly,
        Self::Mongodb,
        Self::Clickhouse,
    ];

    /// Wire name of the engine.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Postgresql => "postgresql",
            Self::Mysql => "mysql",
            Self::Mariadb => "mariadb",
            Self::Redis => "redis",
            Self::Keydb => "keydb",
            Self::Dragonfly => "dragonfly",
            Self::Mongodb => "mongodb",
            Self::Clickhouse => "clickhouse",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DatabaseType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| format!("unknown database type '{s}'"))
    }
}

/// Lifecycle status of a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseStatus {
    /// Registered, no container yet.
    Created,
    /// Container being created.
    Provisioning,
    /// Accepting connections.
    Running,
    /// Stopped by a user.
    Stopped,
    /// Provisioning or start failed.
    Failed,
    /// Being removed.
    Deleting,
    /// Status not known to this client.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for DatabaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Provisioning => write!(f, "provisioning"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
            Self::Deleting => write!(f, "deleting"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ============================================================================
// Engine configuration
// ============================================================================

/// Extra environment passed to the database container.
pub type Environment = BTreeMap<String, String>;

/// PostgreSQL settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Server version, e.g. `16`.
    pub version: String,
    /// Initial database.
    pub database_name: String,
    /// Owner role.
    pub username: String,
    /// Owner password.
    pub password: String,
    /// Listen port.
    pub port: u16,
    /// Extensions to enable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    /// Extra environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
}

/// MySQL and MariaDB settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MysqlConfig {
    /// Server version.
    pub version: String,
    /// Initial database.
    pub database_name: String,
    /// Application user.
    pub username: String,
    /// Application user password.
    pub password: String,
    /// Root password.
    pub root_password: String,
    /// Listen port.
    pub port: u16,
    /// Default character set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_set: Option<String>,
    /// Default collation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    /// Extra environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
}

/// Persistence mode of Redis-compatible engines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persistence {
    /// Whether data is persisted.
    pub enabled: bool,
    /// Mode, e.g. `rdb` or `aof`.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Redis and KeyDB settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Server version.
    pub version: String,
    /// `requirepass` value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Listen port.
    pub port: u16,
    /// Default database index.
    #[serde(default)]
    pub database: u32,
    /// `maxmemory`, e.g. `256mb`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_memory: Option<String>,
    /// `maxmemory-policy`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_memory_policy: Option<String>,
    /// Persistence mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence: Option<Persistence>,
    /// Extra environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
}

/// Dragonfly settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragonflyConfig {
    /// Server version.
    pub version: String,
    /// Password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Listen port.
    pub port: u16,
    /// Memory cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_memory: Option<String>,
    /// Whether snapshots are written.
    #[serde(default)]
    pub persistence: bool,
    /// Extra environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
}

/// MongoDB settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MongoConfig {
    /// Server version.
    pub version: String,
    /// Initial database.
    pub database_name: String,
    /// Root user.
    pub username: String,
    /// Root password.
    pub password: String,
    /// Listen port.
    pub port: u16,
    /// Authentication database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_source: Option<String>,
    /// Replica set name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_set: Option<String>,
    /// Extra environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
}

/// ClickHouse settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickhouseConfig {
    /// Server version.
    pub version: String,
    /// Initial database.
    pub database_name: String,
    /// User.
    pub username: String,
    /// Password.
    pub password: String,
    /// Native protocol port.
    pub port: u16,
    /// HTTP interface port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_port: Option<u16>,
    /// Extra environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
}

/// Engine configuration. Only the block matching `kind` is expected to be
/// set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Engine this configuration is for.
    #[serde(rename = "type")]
    pub kind: DatabaseType,
    /// PostgreSQL block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postgresql: Option<PostgresConfig>,
    /// MySQL block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mysql: Option<MysqlConfig>,
    /// MariaDB block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mariadb: Option<MysqlConfig>,
    /// Redis block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis: Option<RedisConfig>,
    /// KeyDB block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keydb: Option<RedisConfig>,
    /// Dragonfly block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dragonfly: Option<DragonflyConfig>,
    /// MongoDB block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mongodb: Option<MongoConfig>,
    /// ClickHouse block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clickhouse: Option<ClickhouseConfig>,
}

impl DatabaseConfig {
    /// Configuration for `kind` with no engine block, letting the server
    /// pick defaults.
    #[must_use]
    pub const fn empty(kind: DatabaseType) -> Self {
        Self {
            kind,
            postgresql: None,
            mysql: None,
            mariadb: None,
            redis: None,
            keydb: None,
            dragonfly: None,
            mongodb: None,
            clickhouse: None,
        }
    }

    /// Listen port of the engine block matching `kind`, if present.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        match self.kind {
            DatabaseType::Postgresql => self.postgresql.as_ref().map(|c| c.port),
            DatabaseType::Mysql => self.mysql.as_ref().map(|c| c.port),
            DatabaseType::Mariadb => self.mariadb.as_ref().map(|c| c.port),
            DatabaseType::Redis => self.redis.as_ref().map(|c| c.port),
            DatabaseType::Keydb => self.keydb.as_ref().map(|c| c.port),
            DatabaseType::Dragonfly => self.dragonfly.as_ref().map(|c| c.port),
            DatabaseType::Mongodb => self.mongodb.as_ref().map(|c| c.port),
            DatabaseType::Clickhouse => self.clickhouse.as_ref().map(|c| c.port),
        }
    }
}

// ============================================================================
// Resources
// ============================================================================

/// A managed database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    /// Database ID.
    pub id: String,
    /// Name, unique within the project.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Engine.
    #[serde(rename = "type")]
    pub kind: DatabaseType,
    /// Owning project.
    pub project_id: String,
    /// Environment the database runs in.
    pub environment_id: String,
    /// Current status.
    pub status: DatabaseStatus,
    /// Engine configuration.
    pub config: DatabaseConfig,
    /// Connection string for applications in the same environment.
    #[serde(default)]
    pub connection_string: String,
    /// Published ports by name.
    #[serde(default)]
    pub ports: BTreeMap<String, u16>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update.
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /projects/{p}/databases`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDatabaseRequest {
    /// Name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Engine.
    #[serde(rename = "type")]
    pub kind: DatabaseType,
    /// Target environment.
    pub environment_id: String,
    /// Engine configuration; server defaults when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<DatabaseConfig>,
}

/// Action for `POST .../action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseAction {
    /// Start the container.
    Start,
    /// Stop the container.
    Stop,
}

impl std::fmt::Display for DatabaseAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
        }
    }
}

#[derive(Serialize)]
struct ActionBody {
    action: DatabaseAction,
}

#[derive(Deserialize)]
struct DatabasesResponse {
    databases: Vec<Database>,
}

#[derive(Deserialize)]
struct DatabaseTypesResponse {
    types: Vec<DatabaseType>,
}

/// Database endpoints, borrowed from [`ApiClient::databases`].
#[derive(Debug, Clone, Copy)]
pub struct DatabasesApi<'a> {
    client: &'a ApiClient,
}

impl<'a> DatabasesApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Databases of a project, optionally limited to one environment.
    pub async fn list(
        &self,
        project_id: &str,
        environment_id: Option<&str>,
    ) -> Result<Vec<Database>> {
        let mut url = self.client.url(&["projects", project_id, "databases"]);
        if let Some(environment_id) = environment_id {
            url.query_pairs_mut()
                .append_pair("environment_id", environment_id);
        }
        let response: DatabasesResponse = self.client.get(url).await?;
        Ok(response.databases)
    }

    /// One database.
    pub async fn get(&self, project_id: &str, database_id: &str) -> Result<Database> {
        let url = self
            .client
            .url(&["projects", project_id, "databases", database_id]);
        self.client.get(url).await
    }

    /// Create a database.
    pub async fn create(
        &self,
        project_id: &str,
        request: &CreateDatabaseRequest,
    ) -> Result<Database> {
        let url = self.client.url(&["projects", project_id, "databases"]);
        let database: Database = self.client.post(url, request).await?;
        info!(database = %database.id, kind = %database.kind, "database created");
        Ok(database)
    }

    /// Delete a database.
    pub async fn delete(&self, project_id: &str, database_id: &str) -> Result<()> {
        let url = self
            .client
            .url(&["projects", project_id, "databases", database_id]);
        self.client.delete(url).await?;
        info!(database = %database_id, "database deleted");
        Ok(())
    }

    /// Engines the server can provision.
    pub async fn types(&self, project_id: &str) -> Result<Vec<DatabaseType>> {
        let url = self
            .client
            .url(&["projects", project_id, "databases", "types"]);
        let response: DatabaseTypesResponse = self.client.get(url).await?;
        Ok(response.types)
    }

    /// Server default configuration for an engine.
    pub async fn default_config(
        &self,
        project_id: &str,
        kind: DatabaseType,
    ) -> Result<DatabaseConfig> {
        let url = self.client.url(&[
            "projects",
            project_id,
            "databases",
            "types",
            kind.as_str(),
            "config",
        ]);
        self.client.get(url).await
    }

    /// Start or stop a database.
    pub async fn action(
        &self,
        project_id: &str,
        database_id: &str,
        action: DatabaseAction,
    ) -> Result<ActionResponse> {
        let url = self
            .client
            .url(&["projects", project_id, "databases", database_id, "action"]);
        let response = self.client.post(url, &ActionBody { action }).await?;
        info!(database = %database_id, %action, "database action sent");
        Ok(response)
    }

    /// Stream the container log of a database.
    ///
    /// With `follow` the stream stays open for new output until cancelled.
    /// Must be called inside a tokio runtime.
    pub fn stream_logs<L, E>(
        &self,
        project_id: &str,
        database_id: &str,
        follow: bool,
        on_line: L,
        on_error: E,
    ) -> StreamHandle
    where
        L: FnMut(String) + Send + 'static,
        E: FnOnce(StreamError) + Send + 'static,
    {
        let url = self
            .client
            .url(&["projects", project_id, "databases", database_id, "logs"]);
        self.client.stream_logs(url, follow, on_line, on_error)
    }
}
