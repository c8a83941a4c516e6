//! Shared fixtures.

use flow_reports::api::QueryService;
use flow_reports::config::{CacheConfig, Config, DataSourceConfig, DataSourceRecord, EngineConfig};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use tempfile::TempDir;

/// Owner of every fixture data source.
pub const OWNER: &str = "alice";

/// Id of the fixture data source.
pub const SOURCE_ID: i64 = 1;

/// A SQLite database file seeded with a `customers` table.
pub struct SqliteFixture {
    pub dir: TempDir,
    pub config: DataSourceConfig,
}

impl SqliteFixture {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports.db");

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();
        for statement in [
            "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL, signed_up TEXT, balance REAL)",
            "INSERT INTO customers VALUES (1, 'Ada', '2024-01-15T10:00:00', 12.5)",
            "INSERT INTO customers VALUES (2, 'Grace', '2024-02-01T09:30:00', NULL)",
            "INSERT INTO customers VALUES (3, 'Linus', NULL, 0.0)",
            "CREATE TABLE invoices (id INTEGER PRIMARY KEY, customer_id INTEGER, amount REAL)",
        ] {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }
        pool.close().await;

        let config = DataSourceConfig::sqlite(path.to_string_lossy());
        Self { dir, config }
    }

    /// A service serving this database as data source [`SOURCE_ID`].
    pub fn service(&self) -> QueryService {
        self.service_with(EngineConfig::default())
    }

    pub fn service_with(&self, engine: EngineConfig) -> QueryService {
        service_for(self.config.clone(), engine)
    }
}

/// A service serving `config` as data source [`SOURCE_ID`] owned by [`OWNER`].
pub fn service_for(config: DataSourceConfig, engine: EngineConfig) -> QueryService {
    QueryService::from_config(&Config {
        engine,
        cache: CacheConfig::default(),
        data_sources: vec![DataSourceRecord {
            id: SOURCE_ID,
            owner: OWNER.to_string(),
            name: "fixture".to_string(),
            config,
        }],
    })
}

/// Reads a live database config from `var`, if set.
pub fn live_config(var: &str) -> Option<DataSourceConfig> {
    let url = std::env::var(var).ok()?;
    DataSourceConfig::from_connection_string(&url).ok()
}
