//! Query execution.
//!
//! Isolates validation, row capping, connection handling and normalization
//! from the service layer.

pub mod executor;

pub use executor::{table_to_sql, with_limit, ConnectionTest, QueryExecutor, CONNECTION_OK};
