//! Mock database client for testing.
//!
//! Provides an in-memory client and connector so the executor and service
//! layer can be exercised without a database server.

use super::{Connector, DatabaseClient, RawResult, SchemaEntry};
use crate::config::DataSourceConfig;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A mock database client that returns predefined results.
///
/// Clones share the executed-statement log and the close counter.
#[derive(Debug, Clone, Default)]
pub struct MockDatabaseClient {
    tables: Vec<SchemaEntry>,
    result: RawResult,
    execute_error: Option<String>,
    columns_error: Option<String>,
    executed: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with no tables and an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tables reported by introspection.
    pub fn with_tables(mut self, tables: Vec<SchemaEntry>) -> Self {
        self.tables = tables;
        self
    }

    /// Sets the result returned by every query.
    pub fn with_result(mut self, result: RawResult) -> Self {
        self.result = result;
        self
    }

    /// Makes every query fail with `message`.
    pub fn failing_execute(mut self, message: impl Into<String>) -> Self {
        self.execute_error = Some(message.into());
        self
    }

    /// Makes column listing fail with `message`.
    pub fn failing_columns(mut self, message: impl Into<String>) -> Self {
        self.columns_error = Some(message.into());
        self
    }

    /// Statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// How many times `close` has been called.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query(&self, sql: &str) -> Result<RawResult> {
        if let Ok(mut log) = self.executed.lock() {
            log.push(sql.to_string());
        }
        match &self.execute_error {
            Some(message) => Err(EngineError::execution(message.clone())),
            None => Ok(self.result.clone()),
        }
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        if let Some(message) = &self.columns_error {
            return Err(EngineError::execution(message.clone()));
        }
        Ok(self
            .tables
            .iter()
            .find(|t| t.name == table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A connector that hands out clones of one mock client.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    client: MockDatabaseClient,
    connect_error: Option<String>,
    connects: Arc<AtomicUsize>,
}

impl MockConnector {
    /// Creates a connector serving `client`.
    pub fn new(client: MockDatabaseClient) -> Self {
        Self {
            client,
            ..Default::default()
        }
    }

    /// Creates a connector whose every connect attempt fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            connect_error: Some(message.into()),
            ..Default::default()
        }
    }

    /// The client handed out on connect.
    pub fn client(&self) -> &MockDatabaseClient {
        &self.client
    }

    /// How many connections have been opened.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        config: &DataSourceConfig,
        _timeout: Duration,
    ) -> Result<Box<dyn DatabaseClient>> {
        config.validate()?;
        self.connects.fetch_add(1, Ordering::SeqCst);
        match &self.connect_error {
            Some(message) => Err(EngineError::connection(message.clone())),
            None => Ok(Box::new(self.client.clone())),
        }
    }
}
