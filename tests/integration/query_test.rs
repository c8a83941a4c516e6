//! Query execution against live Postgres and MySQL servers.
//!
//! Skipped unless DATABASE_URL (Postgres) or MYSQL_URL (MySQL) is set.

use super::common::{live_config, service_for, OWNER, SOURCE_ID};
use flow_reports::api::{QueryService, RunQueryRequest};
use flow_reports::config::EngineConfig;
use flow_reports::normalize::NormalizedValue;

fn postgres_service() -> Option<QueryService> {
    live_config("DATABASE_URL").map(|config| service_for(config, EngineConfig::default()))
}

fn mysql_service() -> Option<QueryService> {
    live_config("MYSQL_URL").map(|config| service_for(config, EngineConfig::default()))
}

#[tokio::test]
async fn test_postgres_simple_select() {
    let Some(service) = postgres_service() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let response = service
        .run_query(
            OWNER,
            SOURCE_ID,
            &RunQueryRequest::sql("SELECT 1 AS num, 'hello' AS greeting, NULL::int AS nothing"),
        )
        .await;

    assert_eq!(response.status, 200, "{:?}", response.body.error);
    assert_eq!(response.body.columns, vec!["num", "greeting", "nothing"]);
    let row = &response.body.rows[0];
    assert_eq!(row["num"], NormalizedValue::Number(1.into()));
    assert_eq!(row["greeting"].as_str(), Some("hello"));
    assert!(row["nothing"].is_null());
}

#[tokio::test]
async fn test_postgres_normalizes_temporal_and_decimal() {
    let Some(service) = postgres_service() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let response = service
        .run_query(
            OWNER,
            SOURCE_ID,
            &RunQueryRequest::sql(
                "SELECT TIMESTAMP '2024-01-15 10:00:00' AS ts, DATE '2024-03-01' AS d, \
                 12.50::numeric AS total, true AS flag",
            ),
        )
        .await;

    assert_eq!(response.status, 200, "{:?}", response.body.error);
    let row = &response.body.rows[0];
    assert_eq!(row["ts"].as_str(), Some("2024-01-15T10:00:00"));
    assert_eq!(row["d"].as_str(), Some("2024-03-01"));
    assert_eq!(row["total"].as_f64(), Some(12.5));
    assert_eq!(row["flag"], NormalizedValue::Bool(true));
}

#[tokio::test]
async fn test_postgres_missing_table() {
    let Some(service) = postgres_service() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let response = service
        .run_query(OWNER, SOURCE_ID, &RunQueryRequest::table("nonexistent_table_xyz"))
        .await;

    assert_eq!(response.status, 400);
    let error = response.body.error.unwrap_or_default();
    assert!(error.contains("nonexistent_table_xyz"), "unexpected error: {error}");
}

#[tokio::test]
async fn test_mysql_simple_select() {
    let Some(service) = mysql_service() else {
        eprintln!("Skipping test: MYSQL_URL not set");
        return;
    };

    let response = service
        .run_query(
            OWNER,
            SOURCE_ID,
            &RunQueryRequest::sql(
                "SELECT 1 AS num, 'hello' AS greeting, \
                 CAST('2024-01-15 10:00:00' AS DATETIME) AS ts, \
                 CAST(12.50 AS DECIMAL(5,2)) AS total",
            ),
        )
        .await;

    assert_eq!(response.status, 200, "{:?}", response.body.error);
    let row = &response.body.rows[0];
    assert_eq!(row["num"], NormalizedValue::Number(1.into()));
    assert_eq!(row["greeting"].as_str(), Some("hello"));
    assert_eq!(row["ts"].as_str(), Some("2024-01-15T10:00:00"));
    assert_eq!(row["total"].as_f64(), Some(12.5));
}

#[tokio::test]
async fn test_mysql_table_query_uses_backticks() {
    let Some(service) = mysql_service() else {
        eprintln!("Skipping test: MYSQL_URL not set");
        return;
    };

    let response = service
        .run_query(OWNER, SOURCE_ID, &RunQueryRequest::table("nonexistent_table_xyz"))
        .await;

    assert_eq!(response.status, 400);
    let error = response.body.error.unwrap_or_default();
    assert!(error.contains("nonexistent_table_xyz"), "unexpected error: {error}");
}
