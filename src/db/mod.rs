pub mod demo;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod schema;
pub mod sqlserver;
pub mod table;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::config::AppConfig;
pub use table::ResultTable;

/// The databases a session can connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DatabaseKind {
    #[default]
    #[serde(rename = "Demo Database", alias = "Demo")]
    Demo,
    #[serde(rename = "MySQL")]
    MySql,
    #[serde(rename = "SQL Server")]
    SqlServer,
    #[serde(rename = "PostgreSQL")]
    PostgreSql,
}

impl DatabaseKind {
    pub const ALL: [DatabaseKind; 4] = [
        DatabaseKind::Demo,
        DatabaseKind::MySql,
        DatabaseKind::SqlServer,
        DatabaseKind::PostgreSql,
    ];

    /// Menu label, identical to the serialized form
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Demo => "Demo Database",
            Self::MySql => "MySQL",
            Self::SqlServer => "SQL Server",
            Self::PostgreSql => "PostgreSQL",
        }
    }

    #[must_use]
    pub const fn default_port(&self) -> u16 {
        match self {
            Self::Demo => 0,
            Self::MySql => 3306,
            Self::SqlServer => 1433,
            Self::PostgreSql => 5432,
        }
    }

    /// The demo database is public; everything else needs the full form.
    #[must_use]
    pub const fn requires_credentials(&self) -> bool {
        !matches!(self, Self::Demo)
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("{0}")]
    Connect(String),

    #[error("{0}")]
    Query(String),

    #[error("{kind} support is not enabled in this build")]
    Unsupported { kind: DatabaseKind },

    #[error("Failed to download demo database: {0}")]
    Download(String),

    #[error("Database task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for DbError {
    fn from(err: tokio::task::JoinError) -> Self {
        DbError::Task(err.to_string())
    }
}

/// A named bundle of connection parameters.
///
/// The password is stored and persisted in plain text.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: DatabaseKind,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl ConnectionProfile {
    pub fn demo() -> Self {
        Self {
            name: None,
            kind: DatabaseKind::Demo,
            host: String::new(),
            port: 0,
            database: String::new(),
            username: String::new(),
            password: String::new(),
        }
    }

    /// Everything except the password
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            name: self.name.clone(),
            kind: self.kind,
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            username: self.username.clone(),
        }
    }
}

// Keeps passwords out of logs
impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: DatabaseKind,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
}

/// Runs SQL against one established connection.
///
/// Every statement the pipeline issues goes through the executor the
/// connection manager handed out, whatever the database kind.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    fn kind(&self) -> DatabaseKind;

    async fn execute(&self, sql: &str) -> Result<ResultTable, DbError>;

    /// Markdown description of the tables, fed to the translation prompt.
    async fn describe_schema(&self) -> Result<String, DbError> {
        let catalog = self.execute(schema::catalog_query(self.kind())).await?;
        Ok(schema::format_schema(&catalog))
    }
}

/// Opens connections for one database kind.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, profile: &ConnectionProfile)
    -> Result<Arc<dyn QueryExecutor>, DbError>;
}

/// One connector per database kind.
#[derive(Clone)]
pub struct Connectors {
    demo: Arc<dyn Connector>,
    mysql: Arc<dyn Connector>,
    sqlserver: Arc<dyn Connector>,
    postgres: Arc<dyn Connector>,
}

impl Connectors {
    pub fn from_config(config: &AppConfig) -> Self {
        let demo: Arc<dyn Connector> = Arc::new(demo::DemoConnector::new(
            config.connection.demo_url.clone(),
            config.demo_cache_path(),
        ));

        #[cfg(feature = "mysql")]
        let mysql: Arc<dyn Connector> = Arc::new(mysql::MySqlConnector);
        #[cfg(not(feature = "mysql"))]
        let mysql: Arc<dyn Connector> = Arc::new(UnsupportedConnector(DatabaseKind::MySql));

        #[cfg(feature = "postgres")]
        let postgres: Arc<dyn Connector> = Arc::new(postgres::PostgresConnector);
        #[cfg(not(feature = "postgres"))]
        let postgres: Arc<dyn Connector> = Arc::new(UnsupportedConnector(DatabaseKind::PostgreSql));

        Self {
            demo,
            mysql,
            sqlserver: Arc::new(sqlserver::SqlServerConnector::new(
                config.connection.odbc_driver.clone(),
            )),
            postgres,
        }
    }

    /// Every kind served by the same connector
    pub fn uniform(connector: Arc<dyn Connector>) -> Self {
        Self {
            demo: Arc::clone(&connector),
            mysql: Arc::clone(&connector),
            sqlserver: Arc::clone(&connector),
            postgres: connector,
        }
    }

    /// Replace the connector for one kind
    pub fn with(mut self, kind: DatabaseKind, connector: Arc<dyn Connector>) -> Self {
        match kind {
            DatabaseKind::Demo => self.demo = connector,
            DatabaseKind::MySql => self.mysql = connector,
            DatabaseKind::SqlServer => self.sqlserver = connector,
            DatabaseKind::PostgreSql => self.postgres = connector,
        }
        self
    }

    pub fn for_kind(&self, kind: DatabaseKind) -> Arc<dyn Connector> {
        match kind {
            DatabaseKind::Demo => Arc::clone(&self.demo),
            DatabaseKind::MySql => Arc::clone(&self.mysql),
            DatabaseKind::SqlServer => Arc::clone(&self.sqlserver),
            DatabaseKind::PostgreSql => Arc::clone(&self.postgres),
        }
    }
}

/// Stands in for a driver left out of the build.
pub struct UnsupportedConnector(pub DatabaseKind);

#[async_trait]
impl Connector for UnsupportedConnector {
    async fn connect(
        &self,
        _profile: &ConnectionProfile,
    ) -> Result<Arc<dyn QueryExecutor>, DbError> {
        Err(DbError::Unsupported { kind: self.0 })
    }
}
