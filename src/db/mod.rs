//! Database abstraction layer.
//!
//! Provides a trait-based interface over the three supported dialects so the
//! executor can introspect and query any of them the same way.

mod errors;
mod mock;
mod mysql;
mod postgres;
mod row;
mod sqlite;
mod types;

pub use mock::{MockConnector, MockDatabaseClient};
pub use mysql::MySqlClient;
pub use postgres::PostgresClient;
pub use sqlite::SqliteClient;
pub use types::{QueryResult, RawResult, Row, SchemaEntry};

use crate::config::DataSourceConfig;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum DatabaseBackend {
    #[default]
    #[serde(rename = "postgresql", alias = "postgres")]
    Postgres,
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "sqlite")]
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend's wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgresql",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }

    /// Parses a backend from a string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(EngineError::unsupported_dialect(s)),
        }
    }

    /// Returns the default port for this backend. SQLite has none.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Postgres => 5432,
            Self::MySql => 3306,
            Self::Sqlite => 0,
        }
    }

    /// Quotes an already validated identifier for this dialect.
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            Self::MySql => format!("`{name}`"),
            Self::Postgres | Self::Sqlite => format!("\"{name}\""),
        }
    }
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Creates a database client for the configured backend.
///
/// This is the central factory function for database connections.
pub async fn connect(
    config: &DataSourceConfig,
    timeout: Duration,
) -> Result<Box<dyn DatabaseClient>> {
    config.validate()?;
    debug!("Opening connection to {}", config.display_string());
    match config.kind {
        DatabaseBackend::Postgres => {
            let client = PostgresClient::connect(config, timeout).await?;
            Ok(Box::new(client))
        }
        DatabaseBackend::MySql => {
            let client = MySqlClient::connect(config, timeout).await?;
            Ok(Box::new(client))
        }
        DatabaseBackend::Sqlite => {
            let client = SqliteClient::connect(config, timeout).await?;
            Ok(Box::new(client))
        }
    }
}

/// Trait defining the interface for database clients.
///
/// All database operations are async and return Results with EngineError.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes a single SQL statement and returns every row it produces.
    async fn execute_query(&self, sql: &str) -> Result<RawResult>;

    /// Lists user tables, ordered by name.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Lists the columns of `table` in ordinal order.
    async fn list_columns(&self, table: &str) -> Result<Vec<String>>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}

/// Opens clients on behalf of the executor.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a connection, failing if it cannot be established within `timeout`.
    async fn connect(
        &self,
        config: &DataSourceConfig,
        timeout: Duration,
    ) -> Result<Box<dyn DatabaseClient>>;
}

/// Connector backed by the real sqlx drivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverConnector;

#[async_trait]
impl Connector for DriverConnector {
    async fn connect(
        &self,
        config: &DataSourceConfig,
        timeout: Duration,
    ) -> Result<Box<dyn DatabaseClient>> {
        connect(config, timeout).await
    }
}
