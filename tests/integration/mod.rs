//! Integration tests for flow-reports.

pub mod cache_test;
pub mod common;
pub mod connection_test;
pub mod query_test;
pub mod schema_test;
pub mod sqlite_test;
