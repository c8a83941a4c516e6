//! MySQL database client implementation.

use super::errors::{connect_timed_out, format_query_error, map_connection_error};
use super::row::{column_names, decode, decode_text, is_null};
use crate::config::DataSourceConfig;
use crate::db::{DatabaseClient, RawResult};
use crate::error::{EngineError, Result};
use crate::normalize::NativeValue;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Executor, Row as SqlxRow, Statement, TypeInfo};
use std::time::{Duration, Instant};
use tracing::debug;

/// MySQL database client.
#[derive(Debug)]
pub struct MySqlClient {
    pool: MySqlPool,
    database: String,
}

impl MySqlClient {
    /// Opens a single-connection pool, giving up after `timeout`.
    ///
    /// `config` must already have passed [`DataSourceConfig::validate`].
    pub(crate) async fn connect(config: &DataSourceConfig, timeout: Duration) -> Result<Self> {
        let database = config.database().unwrap_or_default();

        let mut options = MySqlConnectOptions::new()
            .host(config.host())
            .port(config.port())
            .database(database);
        if let Some(user) = config.user.as_deref() {
            options = options.username(user);
        }
        if let Some(password) = config.password.as_deref() {
            options = options.password(password);
        }

        let connecting = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(timeout)
            .connect_with(options);

        let pool = tokio::time::timeout(timeout, connecting)
            .await
            .map_err(|_| connect_timed_out(config, Some(timeout)))?
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Connected to {}", config.display_string());
        Ok(Self {
            pool,
            database: database.to_string(),
        })
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
impl DatabaseClient for MySqlClient {
    async fn execute_query(&self, sql: &str) -> Result<RawResult> {
        let start = Instant::now();

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EngineError::execution(format_query_error(e)))?;

        debug!("MySQL returned {} rows in {:?}", rows.len(), start.elapsed());

        let columns = match rows.first() {
            Some(first) => column_names(first),
            None => self.statement_columns(sql).await,
        };

        Ok(RawResult::new(columns, rows.iter().map(convert_row).collect()))
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SHOW TABLES")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EngineError::execution(format!("Failed to fetch tables: {e}")))?;

        let mut tables: Vec<String> = rows.iter().filter_map(|row| decode_text(row, 0)).collect();
        tables.sort();
        Ok(tables)
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT column_name
            FROM information_schema.columns
            WHERE table_schema = ? AND table_name = ?
            ORDER BY ordinal_position
            "#,
        )
        .bind(&self.database)
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EngineError::execution(format!("Failed to fetch columns for {table}: {e}")))?;

        Ok(rows.iter().filter_map(|row| decode_text(row, 0)).collect())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn convert_row(row: &MySqlRow) -> Vec<NativeValue> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a MySqlRow by its declared type name.
fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> NativeValue {
    if is_null(row, index) {
        return NativeValue::Null;
    }

    let upper = type_name.to_uppercase();
    let value = match upper.as_str() {
        "BOOLEAN" => decode::<_, bool>(row, index).map(NativeValue::Bool),
        t if t.ends_with("UNSIGNED") => decode::<_, u64>(row, index).map(NativeValue::UInt),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            decode::<_, i64>(row, index).map(NativeValue::Int)
        }
        "FLOAT" => decode::<_, f32>(row, index).map(|v| NativeValue::Float(v.into())),
        "DOUBLE" => decode::<_, f64>(row, index).map(NativeValue::Float),
        "DECIMAL" => decode::<_, BigDecimal>(row, index).map(NativeValue::Decimal),
        "DATE" => decode::<_, NaiveDate>(row, index).map(NativeValue::Date),
        "TIME" => decode::<_, NaiveTime>(row, index).map(NativeValue::Time),
        "DATETIME" | "TIMESTAMP" => {
            decode::<_, NaiveDateTime>(row, index).map(NativeValue::DateTime)
        }
        "JSON" => decode::<_, serde_json::Value>(row, index).map(NativeValue::Json),
        "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" | "SET" => {
            decode::<_, String>(row, index).map(NativeValue::Text)
        }
        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            decode::<_, Vec<u8>>(row, index).map(NativeValue::Bytes)
        }
        _ => None,
    };

    value
        .or_else(|| decode::<_, String>(row, index).map(NativeValue::Text))
        .or_else(|| decode::<_, i64>(row, index).map(NativeValue::Int))
        .or_else(|| decode::<_, f64>(row, index).map(NativeValue::Float))
        .or_else(|| decode::<_, Vec<u8>>(row, index).map(NativeValue::Bytes))
        .unwrap_or_else(|| NativeValue::Other(format!("<{type_name}>")))
}
