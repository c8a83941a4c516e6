//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient` trait
//! for PostgreSQL databases using sqlx.

use super::errors::{connect_timed_out, format_query_error, map_connection_error};
use super::row::{column_names, decode, is_null};
use crate::config::DataSourceConfig;
use crate::db::{DatabaseClient, RawResult};
use crate::error::{EngineError, Result};
use crate::normalize::NativeValue;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Executor, Row as SqlxRow, Statement, TypeInfo};
use std::time::{Duration, Instant};
use tracing::debug;

/// PostgreSQL database client.
#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Opens a single-connection pool, giving up after `timeout`.
    ///
    /// `config` must already have passed [`DataSourceConfig::validate`].
    pub(crate) async fn connect(config: &DataSourceConfig, timeout: Duration) -> Result<Self> {
        let database = config.database().unwrap_or_default();

        let mut options = PgConnectOptions::new()
            .host(config.host())
            .port(config.port())
            .database(database);
        if let Some(user) = config.user.as_deref() {
            options = options.username(user);
        }
        if let Some(password) = config.password.as_deref() {
            options = options.password(password);
        }

        let connecting = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(timeout)
            .connect_with(options);

        let pool = tokio::time::timeout(timeout, connecting)
            .await
            .map_err(|_| connect_timed_out(config, Some(timeout)))?
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Connected to {}", config.display_string());
        Ok(Self { pool })
    }

    /// Column names from the prepared statement, for results without rows.
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
impl DatabaseClient for PostgresClient {
    async fn execute_query(&self, sql: &str) -> Result<RawResult> {
        let start = Instant::now();

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EngineError::execution(format_query_error(e)))?;

        debug!("Postgres returned {} rows in {:?}", rows.len(), start.elapsed());

        let columns = match rows.first() {
            Some(first) => column_names(first),
            None => self.statement_columns(sql).await,
        };

        Ok(RawResult::new(columns, rows.iter().map(convert_row).collect()))
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        sqlx::query_scalar(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = 'public' AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EngineError::execution(format!("Failed to fetch tables: {e}")))
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        sqlx::query_scalar(
            r#"
            SELECT column_name::text
            FROM information_schema.columns
            WHERE table_schema = 'public' AND table_name = $1
            ORDER BY ordinal_position
            "#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EngineError::execution(format!("Failed to fetch columns for {table}: {e}")))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Converts a sqlx PgRow to native values.
fn convert_row(row: &PgRow) -> Vec<NativeValue> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow by its declared type name.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> NativeValue {
    if is_null(row, index) {
        return NativeValue::Null;
    }

    let value = match type_name.to_uppercase().as_str() {
        "BOOL" => decode::<_, bool>(row, index).map(NativeValue::Bool),
        "INT2" => decode::<_, i16>(row, index).map(|v| NativeValue::Int(v.into())),
        "INT4" => decode::<_, i32>(row, index).map(|v| NativeValue::Int(v.into())),
        "INT8" => decode::<_, i64>(row, index).map(NativeValue::Int),
        "OID" => decode::<_, sqlx::postgres::types::Oid>(row, index)
            .map(|v| NativeValue::UInt(v.0.into())),
        "FLOAT4" => decode::<_, f32>(row, index).map(|v| NativeValue::Float(v.into())),
        "FLOAT8" => decode::<_, f64>(row, index).map(NativeValue::Float),
        "NUMERIC" => decode::<_, BigDecimal>(row, index).map(NativeValue::Decimal),
        "DATE" => decode::<_, NaiveDate>(row, index).map(NativeValue::Date),
        "TIME" => decode::<_, NaiveTime>(row, index).map(NativeValue::Time),
        "TIMESTAMP" => decode::<_, NaiveDateTime>(row, index).map(NativeValue::DateTime),
        "TIMESTAMPTZ" => decode::<_, DateTime<FixedOffset>>(row, index).map(NativeValue::DateTimeTz),
        "UUID" => decode::<_, uuid::Uuid>(row, index).map(NativeValue::Uuid),
        "JSON" | "JSONB" => decode::<_, serde_json::Value>(row, index).map(NativeValue::Json),
        "BYTEA" => decode::<_, Vec<u8>>(row, index).map(NativeValue::Bytes),
        _ => decode::<_, String>(row, index).map(NativeValue::Text),
    };

    value.unwrap_or_else(|| NativeValue::Other(format!("<{type_name}>")))
}
