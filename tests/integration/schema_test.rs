//! Schema introspection against live servers.
//!
//! Skipped unless DATABASE_URL (Postgres) or MYSQL_URL (MySQL) is set.

use super::common::{live_config, service_for, OWNER, SOURCE_ID};
use flow_reports::config::EngineConfig;

async fn assert_schema_is_consistent(var: &str) {
    let Some(config) = live_config(var) else {
        eprintln!("Skipping test: {var} not set");
        return;
    };
    let service = service_for(config, EngineConfig::default());

    let response = service.schema(OWNER, SOURCE_ID).await;
    assert_eq!(response.status, 200, "{:?}", response.body.error);

    let names: Vec<&str> = response.body.tables.iter().map(|t| t.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted, "tables should be ordered by name");

    for table in &response.body.tables {
        assert!(
            !table.columns.is_empty(),
            "expected columns for table {}",
            table.name
        );
    }
}

#[tokio::test]
async fn test_postgres_schema() {
    assert_schema_is_consistent("DATABASE_URL").await;
}

#[tokio::test]
async fn test_mysql_schema() {
    assert_schema_is_consistent("MYSQL_URL").await;
}
