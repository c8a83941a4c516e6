//! Service layer.
//!
//! Framework-agnostic endpoint functions. Each returns an [`ApiResponse`]
//! whose body has the same shape on success and failure, so an HTTP adapter
//! only has to serialize it and copy the status.

mod store;
mod translate;

pub use store::{DataSourceStore, MemoryDataSourceStore};
pub use translate::{SqlTranslator, TableLookupTranslator, PLACEHOLDER_SQL};

use crate::cache::{QueryCache, QueryKind, SqliteCacheStore};
use crate::config::{Config, DataSourceConfig, DataSourceRecord, DataSourceView};
use crate::db::{DatabaseBackend, QueryResult, Row, SchemaEntry};
use crate::error::{EngineError, Result};
use crate::query::{table_to_sql, ConnectionTest, QueryExecutor};
use crate::safety::{validate_table_name, SqlValidator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A response body plus its HTTP-equivalent status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub body: T,
}

impl<T> ApiResponse<T> {
    fn new(status: u16, body: T) -> Self {
        Self { status, body }
    }

    fn ok(body: T) -> Self {
        Self::new(200, body)
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Body of the schema endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tables: Vec<SchemaEntry>,
}

/// Request of the run-query endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunQueryRequest {
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub refresh: bool,
}

impl RunQueryRequest {
    /// Request for ad-hoc SQL.
    pub fn sql(sql: impl Into<String>) -> Self {
        Self {
            sql: Some(sql.into()),
            ..Default::default()
        }
    }

    /// Request for every row of a table.
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table_name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Skips the cache read and re-executes.
    pub fn refreshed(mut self) -> Self {
        self.refresh = true;
        self
    }
}

/// Body of the run-query endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunQueryBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub rows: Vec<Row>,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cached: bool,
}

impl RunQueryBody {
    fn success(result: QueryResult, cached: bool) -> Self {
        Self {
            error: None,
            rows: result.rows,
            columns: result.columns,
            cached,
        }
    }

    fn failure(error: &EngineError) -> Self {
        Self {
            error: Some(error.to_string()),
            rows: Vec::new(),
            columns: Vec::new(),
            cached: false,
        }
    }
}

/// Request of the refresh-cache endpoint. Both fields blank clears everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshCacheRequest {
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub sql: Option<String>,
}

/// Body of the refresh-cache endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshCacheBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub invalidated: usize,
}

/// Request of the connection-test endpoint: a stored id, or an inline config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestConnectionRequest {
    #[serde(default)]
    pub data_source_id: Option<i64>,
    #[serde(default)]
    pub db_type: Option<String>,
    #[serde(default)]
    pub config: Option<DataSourceConfig>,
}

/// Request of the generate-SQL endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateSqlRequest {
    #[serde(default)]
    pub natural_language: String,
}

/// Body of the generate-SQL endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateSqlBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub generated_sql: String,
}

/// Body of the data-source endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DataSourceBody {
    Found(DataSourceView),
    Missing { error: String },
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Endpoint functions over a data source store, an executor and a cache.
#[derive(Clone)]
pub struct QueryService {
    sources: Arc<dyn DataSourceStore>,
    executor: QueryExecutor,
    cache: QueryCache,
    translator: Arc<dyn SqlTranslator>,
    validator: SqlValidator,
}

impl QueryService {
    /// Creates a service with the rule-based translator.
    pub fn new(sources: Arc<dyn DataSourceStore>, executor: QueryExecutor, cache: QueryCache) -> Self {
        Self {
            sources,
            executor,
            cache,
            translator: Arc::new(TableLookupTranslator::new()),
            validator: SqlValidator::new(),
        }
    }

    /// Builds a service over the configured data sources, real drivers and an
    /// in-process cache.
    pub fn from_config(config: &Config) -> Self {
        let sources = MemoryDataSourceStore::from_records(config.data_sources.iter().cloned());
        Self::new(
            Arc::new(sources),
            QueryExecutor::with_drivers(&config.engine),
            QueryCache::in_memory(&config.cache),
        )
    }

    /// Like [`QueryService::from_config`], but caches results in the SQLite
    /// file at [`CacheConfig::store_path`] so they outlive the process.
    ///
    /// [`CacheConfig::store_path`]: crate::config::CacheConfig::store_path
    pub async fn open(config: &Config) -> Result<Self> {
        let store = SqliteCacheStore::open(&config.cache.store_path()).await?;
        info!("Using persistent cache at {}", store.path().display());
        let sources = MemoryDataSourceStore::from_records(config.data_sources.iter().cloned());
        Ok(Self::new(
            Arc::new(sources),
            QueryExecutor::with_drivers(&config.engine),
            QueryCache::new(Arc::new(store), &config.cache),
        ))
    }

    /// Replaces the SQL translator.
    pub fn with_translator(mut self, translator: Arc<dyn SqlTranslator>) -> Self {
        self.translator = translator;
        self
    }

    /// The shared result cache.
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    async fn lookup(&self, owner: &str, id: i64) -> Result<DataSourceRecord> {
        self.sources
            .find(owner, id)
            .await?
            .ok_or_else(|| EngineError::not_found(id))
    }

    /// Lists tables and columns of a data source.
    pub async fn schema(&self, owner: &str, id: i64) -> ApiResponse<SchemaBody> {
        let outcome = match self.lookup(owner, id).await {
            Ok(record) => self.executor.describe_schema(&record.config).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(tables) => ApiResponse::ok(SchemaBody {
                error: None,
                tables,
            }),
            Err(e) => ApiResponse::new(
                e.status_code(),
                SchemaBody {
                    error: Some(e.to_string()),
                    tables: Vec::new(),
                },
            ),
        }
    }

    /// Runs ad-hoc SQL or a whole-table select, serving from cache when possible.
    ///
    /// When both `sql` and `table_name` are given, `sql` is used.
    pub async fn run_query(
        &self,
        owner: &str,
        id: i64,
        request: &RunQueryRequest,
    ) -> ApiResponse<RunQueryBody> {
        match self.try_run_query(owner, id, request).await {
            Ok((result, cached)) => ApiResponse::ok(RunQueryBody::success(result, cached)),
            Err(e) => {
                warn!("Query on data source {id} failed: {e}");
                ApiResponse::new(e.status_code(), RunQueryBody::failure(&e))
            }
        }
    }

    async fn try_run_query(
        &self,
        owner: &str,
        id: i64,
        request: &RunQueryRequest,
    ) -> Result<(QueryResult, bool)> {
        let record = self.lookup(owner, id).await?;

        let (kind, key_value, sql) = match (non_blank(&request.sql), non_blank(&request.table_name)) {
            (Some(sql), _) => {
                self.validator.validate(sql)?;
                (QueryKind::Sql, sql, sql.to_string())
            }
            (None, Some(table)) => {
                let table = validate_table_name(table)?;
                (QueryKind::Table, table, table_to_sql(table, record.config.kind))
            }
            (None, None) => {
                return Err(EngineError::validation("Provide 'sql' or 'table_name'."));
            }
        };

        if !request.refresh {
            if let Some(hit) = self.cache.get(id, kind, key_value).await {
                debug!("Serving data source {id} query from cache");
                return Ok((hit, true));
            }
        }

        let result = self.executor.run(&record.config, &sql).await?;
        self.cache.set(id, kind, key_value, &result).await;
        Ok((result, false))
    }

    /// Drops cached results for one query or the whole data source.
    pub async fn refresh_cache(
        &self,
        owner: &str,
        id: i64,
        request: &RefreshCacheRequest,
    ) -> ApiResponse<RefreshCacheBody> {
        if let Err(e) = self.lookup(owner, id).await {
            return ApiResponse::new(
                e.status_code(),
                RefreshCacheBody {
                    error: Some(e.to_string()),
                    invalidated: 0,
                },
            );
        }

        let invalidated = self
            .cache
            .invalidate(id, request.table_name.as_deref(), request.sql.as_deref())
            .await;
        info!("Refreshed cache for data source {id}: {invalidated} entries");
        ApiResponse::ok(RefreshCacheBody {
            error: None,
            invalidated,
        })
    }

    /// Tests connectivity of a stored data source or an unsaved config.
    ///
    /// Status is 200 only when the connection succeeded.
    pub async fn test_connection(
        &self,
        owner: &str,
        request: &TestConnectionRequest,
    ) -> ApiResponse<ConnectionTest> {
        let config = match self.connection_under_test(owner, request).await {
            Ok(config) => config,
            Err(e) => {
                return ApiResponse::new(
                    e.status_code(),
                    ConnectionTest {
                        success: false,
                        message: e.to_string(),
                    },
                )
            }
        };

        let outcome = self.executor.test_connection(&config).await;
        let status = if outcome.success { 200 } else { 400 };
        ApiResponse::new(status, outcome)
    }

    async fn connection_under_test(
        &self,
        owner: &str,
        request: &TestConnectionRequest,
    ) -> Result<DataSourceConfig> {
        if let Some(id) = request.data_source_id {
            return Ok(self.lookup(owner, id).await?.config);
        }

        let db_type = non_blank(&request.db_type)
            .ok_or_else(|| EngineError::validation("db_type is required."))?;
        let mut config = request
            .config
            .clone()
            .ok_or_else(|| EngineError::validation("config is required."))?;
        config.kind = DatabaseBackend::parse(db_type)?;
        Ok(config)
    }

    /// Translates a question into validated read-only SQL for a data source.
    pub async fn generate_sql(
        &self,
        owner: &str,
        id: i64,
        request: &GenerateSqlRequest,
    ) -> ApiResponse<GenerateSqlBody> {
        match self.try_generate_sql(owner, id, &request.natural_language).await {
            Ok(sql) => ApiResponse::ok(GenerateSqlBody {
                error: None,
                generated_sql: sql,
            }),
            Err(e) => ApiResponse::new(
                e.status_code(),
                GenerateSqlBody {
                    error: Some(e.to_string()),
                    generated_sql: String::new(),
                },
            ),
        }
    }

    async fn try_generate_sql(&self, owner: &str, id: i64, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(EngineError::validation("natural_language is required"));
        }

        let record = self.lookup(owner, id).await?;
        let tables = self.executor.describe_schema(&record.config).await?;
        let sql = self
            .translator
            .translate(question, record.config.kind, &tables)
            .await?;
        self.validator.validate(&sql)
    }

    /// Returns the data source with its password masked.
    pub async fn data_source(&self, owner: &str, id: i64) -> ApiResponse<DataSourceBody> {
        match self.lookup(owner, id).await {
            Ok(record) => ApiResponse::ok(DataSourceBody::Found(record.view())),
            Err(e) => ApiResponse::new(
                e.status_code(),
                DataSourceBody::Missing {
                    error: e.to_string(),
                },
            ),
        }
    }
}

impl std::fmt::Debug for QueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryService")
            .field("executor", &self.executor)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
