//! Content-addressed query result cache.
//!
//! Results are keyed by data source and query identity. Each data source also
//! keeps a bounded list of its keys so a full invalidation can find them.
//! Store failures are logged and treated as misses; the cache never fails a
//! query.

mod sqlite_store;
mod store;

pub use sqlite_store::SqliteCacheStore;
pub use store::{CacheStore, MemoryCacheStore};

use crate::config::CacheConfig;
use crate::db::{QueryResult, Row};
use crate::safety::sanitize_identifier;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What a cached query was identified by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// A bare table name.
    Table,
    /// Free-form SQL.
    Sql,
}

/// A stored result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Builds the cache key for a query identity.
///
/// Table names are sanitized to `[A-Za-z0-9._]`; SQL is trimmed, collapsed
/// and lowercased, then hashed, so formatting differences share one entry.
pub fn cache_key(data_source_id: i64, kind: QueryKind, value: &str) -> String {
    let payload = match kind {
        QueryKind::Table => format!("table:{}", sanitize_identifier(value)),
        QueryKind::Sql => {
            let normalized = value
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase();
            let digest = hex::encode(Sha256::digest(normalized.as_bytes()));
            format!("sql:{}", &digest[..32])
        }
    };
    format!("query:{data_source_id}:{payload}")
}

/// Key of the per-source list of cached keys.
pub fn tracking_key(data_source_id: i64) -> String {
    format!("query:keys:{data_source_id}")
}

/// Query result cache over a shared [`CacheStore`].
#[derive(Clone)]
pub struct QueryCache {
    store: Arc<dyn CacheStore>,
    ttl: Option<Duration>,
    max_tracked_keys: usize,
}

impl QueryCache {
    /// Creates a cache over `store` using the configured TTL and key bound.
    pub fn new(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            ttl: config.ttl(),
            max_tracked_keys: config.max_tracked_keys,
        }
    }

    /// Creates a cache over a fresh in-process store.
    pub fn in_memory(config: &CacheConfig) -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()), config)
    }

    /// Returns the cached result for a query identity, if live.
    pub async fn get(&self, data_source_id: i64, kind: QueryKind, value: &str) -> Option<QueryResult> {
        let key = cache_key(data_source_id, kind, value);
        let stored = match self.store.get(&key).await {
            Ok(stored) => stored?,
            Err(e) => {
                warn!("Cache read failed for {key}: {e}");
                return None;
            }
        };

        match serde_json::from_value::<CacheEntry>(stored) {
            Ok(entry) => {
                debug!("Cache hit: {key}");
                Some(QueryResult {
                    columns: entry.columns,
                    rows: entry.rows,
                })
            }
            Err(e) => {
                warn!("Discarding unreadable cache entry {key}: {e}");
                None
            }
        }
    }

    /// Stores a result with the configured TTL.
    pub async fn set(&self, data_source_id: i64, kind: QueryKind, value: &str, result: &QueryResult) {
        self.set_with_ttl(data_source_id, kind, value, result, self.ttl)
            .await;
    }

    /// Stores a result and records its key in the per-source list.
    ///
    /// `ttl` of `None` stores without expiry. The list is rewritten with the
    /// same TTL as the entry.
    pub async fn set_with_ttl(
        &self,
        data_source_id: i64,
        kind: QueryKind,
        value: &str,
        result: &QueryResult,
        ttl: Option<Duration>,
    ) {
        let key = cache_key(data_source_id, kind, value);
        let entry = CacheEntry {
            key: key.clone(),
            columns: result.columns.clone(),
            rows: result.rows.clone(),
        };

        let encoded = match serde_json::to_value(&entry) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Could not encode cache entry {key}: {e}");
                return;
            }
        };
        if let Err(e) = self.store.set(&key, encoded, ttl).await {
            warn!("Cache write failed for {key}: {e}");
            return;
        }
        debug!("Cached {key}");

        let list_key = tracking_key(data_source_id);
        let mut keys = self.tracked_keys(&list_key).await;
        if keys.contains(&key) {
            return;
        }
        keys.push(key);
        if keys.len() > self.max_tracked_keys {
            let excess = keys.len() - self.max_tracked_keys;
            keys.drain(..excess);
        }
        if let Err(e) = self
            .store
            .set(&list_key, serde_json::json!(keys), ttl)
            .await
        {
            warn!("Cache write failed for {list_key}: {e}");
        }
    }

    /// Invalidates one query or everything cached for a data source.
    ///
    /// A non-blank table name (checked first) or SQL removes that single key
    /// and reports 1 whether or not it existed. Otherwise every tracked key
    /// and the list itself are removed and the list length is reported.
    pub async fn invalidate(
        &self,
        data_source_id: i64,
        table_name: Option<&str>,
        sql: Option<&str>,
    ) -> usize {
        let table_name = table_name.map(str::trim).filter(|t| !t.is_empty());
        let sql = sql.map(str::trim).filter(|s| !s.is_empty());

        let single = match (table_name, sql) {
            (Some(table), _) => Some(cache_key(data_source_id, QueryKind::Table, table)),
            (None, Some(sql)) => Some(cache_key(data_source_id, QueryKind::Sql, sql)),
            (None, None) => None,
        };

        if let Some(key) = single {
            self.delete(&key).await;
            info!("Invalidated {key}");
            return 1;
        }

        let list_key = tracking_key(data_source_id);
        let keys = self.tracked_keys(&list_key).await;
        for key in &keys {
            self.delete(key).await;
        }
        self.delete(&list_key).await;
        info!(
            "Invalidated {} cached queries for data source {data_source_id}",
            keys.len()
        );
        keys.len()
    }

    async fn tracked_keys(&self, list_key: &str) -> Vec<String> {
        match self.store.get(list_key).await {
            Ok(Some(stored)) => serde_json::from_value(stored).unwrap_or_else(|e| {
                warn!("Resetting unreadable key list {list_key}: {e}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Cache read failed for {list_key}: {e}");
                Vec::new()
            }
        }
    }

    async fn delete(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            warn!("Cache delete failed for {key}: {e}");
        }
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("ttl", &self.ttl)
            .field("max_tracked_keys", &self.max_tracked_keys)
            .finish_non_exhaustive()
    }
}
