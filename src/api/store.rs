//! Data source lookup.

use crate::config::DataSourceRecord;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Read-only access to stored data sources.
#[async_trait]
pub trait DataSourceStore: Send + Sync {
    /// Returns the data source `id` if it exists and belongs to `owner`.
    async fn find(&self, owner: &str, id: i64) -> Result<Option<DataSourceRecord>>;
}

/// In-memory data source store.
#[derive(Debug, Default)]
pub struct MemoryDataSourceStore {
    records: RwLock<HashMap<i64, DataSourceRecord>>,
}

impl MemoryDataSourceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `records`. Later duplicates of an id win.
    pub fn from_records(records: impl IntoIterator<Item = DataSourceRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().map(|r| (r.id, r)).collect()),
        }
    }

    /// Adds or replaces a record.
    pub async fn insert(&self, record: DataSourceRecord) {
        self.records.write().await.insert(record.id, record);
    }
}

#[async_trait]
impl DataSourceStore for MemoryDataSourceStore {
    async fn find(&self, owner: &str, id: i64) -> Result<Option<DataSourceRecord>> {
        Ok(self
            .records
            .read()
            .await
            .get(&id)
            .filter(|record| record.owner == owner)
            .cloned())
    }
}
