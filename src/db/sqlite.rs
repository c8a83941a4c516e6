//! SQLite database client implementation.
//!
//! Files are opened read-only and never created, so a mistyped path fails to
//! connect instead of silently producing an empty database.

use super::errors::{connect_timed_out, format_query_error, map_connection_error};
use super::row::{column_names, decode_text, decode_unchecked};
use crate::config::DataSourceConfig;
use crate::db::{DatabaseClient, RawResult};
use crate::error::{EngineError, Result};
use crate::normalize::NativeValue;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, Row as SqlxRow, Statement, TypeInfo, ValueRef};
use std::time::{Duration, Instant};
use tracing::debug;

/// SQLite database client.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Opens the database file read-only, giving up after `timeout`.
    ///
    /// `config` must already have passed [`DataSourceConfig::validate`].
    pub(crate) async fn connect(config: &DataSourceConfig, timeout: Duration) -> Result<Self> {
        let path = config.path().unwrap_or_default();

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let connecting = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(timeout)
            .connect_with(options);

        let pool = tokio::time::timeout(timeout, connecting)
            .await
            .map_err(|_| connect_timed_out(config, Some(timeout)))?
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Opened {}", config.display_string());
        Ok(Self { pool })
    }

    async fn statement_columns(&self, sql: &str) -> Vec<String> {
        match (&self.pool).prepare(sql).await {
            Ok(statement) => statement
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect(),
            Err(e) => {
                debug!("Could not describe empty result: {e}");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn execute_query(&self, sql: &str) -> Result<RawResult> {
        let start = Instant::now();

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EngineError::execution(format_query_error(e)))?;

        debug!("SQLite returned {} rows in {:?}", rows.len(), start.elapsed());

        let columns = match rows.first() {
            Some(first) => column_names(first),
            None => self.statement_columns(sql).await,
        };

        Ok(RawResult::new(columns, rows.iter().map(convert_row).collect()))
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EngineError::execution(format!("Failed to fetch tables: {e}")))
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        let pragma = format!("PRAGMA table_info(\"{}\")", table.replace('"', "\"\""));
        let rows = sqlx::query(&pragma)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EngineError::execution(format!("Failed to fetch columns for {table}: {e}")))?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let index = row.columns().iter().position(|c| c.name() == "name")?;
                decode_text(row, index)
            })
            .collect())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn convert_row(row: &SqliteRow) -> Vec<NativeValue> {
    (0..row.len()).map(|i| convert_value(row, i)).collect()
}

/// Converts a value by its storage class rather than the declared column type,
/// since SQLite lets any column hold any class.
fn convert_value(row: &SqliteRow, index: usize) -> NativeValue {
    let storage_class = match row.try_get_raw(index) {
        Ok(value) if value.is_null() => return NativeValue::Null,
        Ok(value) => value.type_info().name().to_uppercase(),
        Err(_) => return NativeValue::Null,
    };

    let value = match storage_class.as_str() {
        "INTEGER" | "BIGINT" | "INT" | "INT8" | "BOOLEAN" => {
            decode_unchecked::<_, i64>(row, index).map(NativeValue::Int)
        }
        "REAL" | "FLOAT" | "DOUBLE" => decode_unchecked::<_, f64>(row, index).map(NativeValue::Float),
        "BLOB" => decode_unchecked::<_, Vec<u8>>(row, index).map(NativeValue::Bytes),
        _ => decode_unchecked::<_, String>(row, index).map(NativeValue::Text),
    };

    value.unwrap_or_else(|| NativeValue::Other(format!("<{storage_class}>")))
}
