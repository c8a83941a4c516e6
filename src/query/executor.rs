//! Query execution behind the read-only gate.
//!
//! Every path opens its own connection, does its work, and closes the
//! connection again whether or not the work succeeded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{DataSourceConfig, EngineConfig};
use crate::db::{Connector, DatabaseBackend, DatabaseClient, DriverConnector, QueryResult, SchemaEntry};
use crate::error::Result;
use crate::safety::SqlValidator;

/// Message reported by a successful connectivity test.
pub const CONNECTION_OK: &str = "Connection successful.";

/// Outcome of a connectivity test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTest {
    pub success: bool,
    pub message: String,
}

impl ConnectionTest {
    fn ok() -> Self {
        Self {
            success: true,
            message: CONNECTION_OK.to_string(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Executes validated, row-capped queries against a data source.
#[derive(Clone)]
pub struct QueryExecutor {
    connector: Arc<dyn Connector>,
    validator: SqlValidator,
    row_limit: usize,
    query_timeout: Duration,
    test_timeout: Duration,
}

impl QueryExecutor {
    /// Creates an executor that opens connections through `connector`.
    pub fn new(connector: Arc<dyn Connector>, engine: &EngineConfig) -> Self {
        Self {
            connector,
            validator: SqlValidator::new(),
            row_limit: engine.row_limit,
            query_timeout: engine.query_connect_timeout(),
            test_timeout: engine.test_connect_timeout(),
        }
    }

    /// Creates an executor backed by the real database drivers.
    pub fn with_drivers(engine: &EngineConfig) -> Self {
        Self::new(Arc::new(DriverConnector), engine)
    }

    /// Validates, caps and runs `sql`, returning normalized rows.
    pub async fn run(&self, config: &DataSourceConfig, sql: &str) -> Result<QueryResult> {
        let normalized = self.validator.validate(sql)?;
        let limited = with_limit(&normalized, self.row_limit);

        let client = self.connector.connect(config, self.query_timeout).await?;

        let start = Instant::now();
        let outcome = client.execute_query(&limited).await;
        close_quietly(client.as_ref()).await;

        match outcome {
            Ok(raw) => {
                info!(
                    "Executed query on {} ({} rows, {:?}): {}",
                    config.display_string(),
                    raw.rows.len(),
                    start.elapsed(),
                    limited
                );
                Ok(raw.into_query_result())
            }
            Err(e) => {
                warn!("Query failed on {}: {e}", config.display_string());
                Err(e)
            }
        }
    }

    /// Lists every table with its columns over a single connection.
    ///
    /// Any failure discards what was collected so far.
    pub async fn describe_schema(&self, config: &DataSourceConfig) -> Result<Vec<SchemaEntry>> {
        let client = self.connector.connect(config, self.query_timeout).await?;
        let outcome = collect_schema(client.as_ref()).await;
        close_quietly(client.as_ref()).await;

        if let Err(e) = &outcome {
            warn!("Schema introspection failed on {}: {e}", config.display_string());
        }
        outcome
    }

    /// Opens and closes a connection with the shorter test timeout.
    pub async fn test_connection(&self, config: &DataSourceConfig) -> ConnectionTest {
        if config.kind == DatabaseBackend::Sqlite && config.path().is_none() {
            return ConnectionTest::failed("File path is required.");
        }

        match self.connector.connect(config, self.test_timeout).await {
            Ok(client) => {
                close_quietly(client.as_ref()).await;
                debug!("Connection test passed for {}", config.display_string());
                ConnectionTest::ok()
            }
            Err(e) => {
                debug!("Connection test failed for {}: {e}", config.display_string());
                ConnectionTest::failed(e.to_string())
            }
        }
    }
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("row_limit", &self.row_limit)
            .field("query_timeout", &self.query_timeout)
            .field("test_timeout", &self.test_timeout)
            .finish_non_exhaustive()
    }
}

async fn collect_schema(client: &dyn DatabaseClient) -> Result<Vec<SchemaEntry>> {
    let tables = client.list_tables().await?;
    let mut entries = Vec::with_capacity(tables.len());
    for table in tables {
        let columns = client.list_columns(&table).await?;
        entries.push(SchemaEntry::new(table, columns));
    }
    Ok(entries)
}

async fn close_quietly(client: &dyn DatabaseClient) {
    if let Err(e) = client.close().await {
        warn!("Failed to close connection: {e}");
    }
}

/// Appends `LIMIT <limit>` unless the statement already mentions `limit`.
///
/// The check is a case-insensitive substring match, so a column or table
/// whose name contains `limit` also suppresses the cap.
pub fn with_limit(sql: &str, limit: usize) -> String {
    if sql.to_lowercase().contains("limit") {
        sql.to_string()
    } else {
        format!("{sql} LIMIT {limit}")
    }
}

/// Builds a full-table select for an already validated table name.
pub fn table_to_sql(name: &str, backend: DatabaseBackend) -> String {
    format!("SELECT * FROM {}", backend.quote_identifier(name))
}
