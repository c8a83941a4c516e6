//! Query result types.
//!
//! [`RawResult`] is what a dialect client hands back; [`QueryResult`] is the
//! normalized, transport-safe form the executor and cache work with.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::normalize::{normalize, NativeValue, NormalizedValue};

/// Rows as decoded by a driver, positionally aligned with `columns`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResult {
    /// Column names in result order.
    pub columns: Vec<String>,

    /// Native values, one vector per row.
    pub rows: Vec<Vec<NativeValue>>,
}

impl RawResult {
    /// Creates a raw result with the given columns and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<NativeValue>>) -> Self {
        Self { columns, rows }
    }

    /// Normalizes every cell and keys each row by column name.
    ///
    /// When a statement returns duplicate column names the last one wins in
    /// the row mapping, while `columns` still lists every name.
    pub fn into_query_result(self) -> QueryResult {
        let columns = self.columns;
        let rows = self
            .rows
            .into_iter()
            .map(|values| {
                columns
                    .iter()
                    .cloned()
                    .zip(values.into_iter().map(normalize))
                    .collect::<Row>()
            })
            .collect();
        QueryResult { columns, rows }
    }
}

/// A result row: column name to normalized value.
pub type Row = BTreeMap<String, NormalizedValue>;

/// Normalized query result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in result order.
    pub columns: Vec<String>,

    /// Rows in the order returned by the engine.
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// Creates an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the result set is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// A table and its column names, read live from the target database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    /// Table name.
    pub name: String,

    /// Column names in ordinal order.
    pub columns: Vec<String>,
}

impl SchemaEntry {
    /// Creates a schema entry.
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_into_query_result_keys_rows_by_column() {
        let raw = RawResult::new(
            vec!["id".to_string(), "name".to_string()],
            vec![
                vec![NativeValue::Int(1), NativeValue::Text("Alice".to_string())],
                vec![NativeValue::Int(2), NativeValue::Null],
            ],
        );

        let result = raw.into_query_result();

        assert_eq!(result.columns, vec!["id", "name"]);
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.rows[0]["id"], NormalizedValue::Number(1.into()));
        assert_eq!(result.rows[0]["name"].as_str(), Some("Alice"));
        assert!(result.rows[1]["name"].is_null());
    }

    #[test]
    fn test_empty_result_keeps_columns() {
        let raw = RawResult::new(vec!["id".to_string()], vec![]);
        let result = raw.into_query_result();
        assert!(result.is_empty());
        assert_eq!(result.columns, vec!["id"]);
    }

    #[test]
    fn test_query_result_serializes_rows_as_objects() {
        let raw = RawResult::new(
            vec!["total".to_string()],
            vec![vec![NativeValue::Float(12.5)]],
        );
        let json = serde_json::to_value(raw.into_query_result()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"columns": ["total"], "rows": [{"total": 12.5}]})
        );
    }
}
