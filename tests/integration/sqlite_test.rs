//! End-to-end service tests on SQLite.

use super::common::{SqliteFixture, OWNER, SOURCE_ID};
use flow_reports::api::{
    DataSourceBody, GenerateSqlRequest, RefreshCacheRequest, RunQueryRequest,
    TestConnectionRequest,
};
use flow_reports::cache::QueryKind;
use flow_reports::config::{DataSourceConfig, EngineConfig};
use flow_reports::db::DatabaseBackend;
use flow_reports::normalize::NormalizedValue;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_missing_table_returns_error_body_and_is_not_cached() {
    let fixture = SqliteFixture::new().await;
    let service = fixture.service();

    let response = service
        .run_query(OWNER, SOURCE_ID, &RunQueryRequest::table("orders"))
        .await;

    assert_eq!(response.status, 400);
    let error = response.body.error.unwrap();
    assert!(error.contains("no such table"), "unexpected error: {error}");
    assert!(response.body.rows.is_empty());
    assert!(response.body.columns.is_empty());
    assert_eq!(
        service.cache().get(SOURCE_ID, QueryKind::Table, "orders").await,
        None
    );
}

#[tokio::test]
async fn test_table_query_then_cache_hit() {
    let fixture = SqliteFixture::new().await;
    let service = fixture.service();
    let request = RunQueryRequest::table("customers");

    let first = service.run_query(OWNER, SOURCE_ID, &request).await;
    assert_eq!(first.status, 200);
    assert!(!first.body.cached);
    assert_eq!(first.body.columns, vec!["id", "name", "signed_up", "balance"]);
    assert_eq!(first.body.rows.len(), 3);

    let ada = &first.body.rows[0];
    assert_eq!(ada["id"], NormalizedValue::Number(1.into()));
    assert_eq!(ada["name"].as_str(), Some("Ada"));
    assert_eq!(ada["signed_up"].as_str(), Some("2024-01-15T10:00:00"));
    assert_eq!(ada["balance"].as_f64(), Some(12.5));
    assert!(first.body.rows[1]["balance"].is_null());

    let second = service.run_query(OWNER, SOURCE_ID, &request).await;
    assert!(second.body.cached);
    assert_eq!(second.body.rows, first.body.rows);
}

#[tokio::test]
async fn test_sql_query_with_row_limit() {
    let fixture = SqliteFixture::new().await;
    let service = fixture.service_with(EngineConfig {
        row_limit: 2,
        ..Default::default()
    });

    let capped = service
        .run_query(OWNER, SOURCE_ID, &RunQueryRequest::sql("SELECT id FROM customers ORDER BY id"))
        .await;
    assert_eq!(capped.body.rows.len(), 2);

    let explicit = service
        .run_query(
            OWNER,
            SOURCE_ID,
            &RunQueryRequest::sql("SELECT id FROM customers ORDER BY id LIMIT 3"),
        )
        .await;
    assert_eq!(explicit.body.rows.len(), 3);
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let fixture = SqliteFixture::new().await;
    let response = fixture
        .service()
        .run_query(OWNER, SOURCE_ID, &RunQueryRequest::table("invoices"))
        .await;

    assert_eq!(response.status, 200);
    assert!(response.body.rows.is_empty());
    assert_eq!(response.body.columns, vec!["id", "customer_id", "amount"]);
}

#[tokio::test]
async fn test_write_attempts_are_rejected() {
    let fixture = SqliteFixture::new().await;
    let service = fixture.service();

    for sql in [
        "DELETE FROM customers",
        "SELECT * FROM customers; DROP TABLE customers",
        "UPDATE customers SET name = 'x'",
        "PRAGMA writable_schema = 1",
    ] {
        let response = service
            .run_query(OWNER, SOURCE_ID, &RunQueryRequest::sql(sql).refreshed())
            .await;
        assert_eq!(response.status, 400, "expected {sql} to be rejected");
    }

    let count = service
        .run_query(
            OWNER,
            SOURCE_ID,
            &RunQueryRequest::sql("SELECT COUNT(*) AS n FROM customers"),
        )
        .await;
    assert_eq!(count.body.rows[0]["n"], NormalizedValue::Number(3.into()));
}

#[tokio::test]
async fn test_schema() {
    let fixture = SqliteFixture::new().await;
    let response = fixture.service().schema(OWNER, SOURCE_ID).await;

    assert_eq!(response.status, 200);
    let names: Vec<_> = response.body.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["customers", "invoices"]);
    assert_eq!(
        response.body.tables[0].columns,
        vec!["id", "name", "signed_up", "balance"]
    );
}

#[tokio::test]
async fn test_schema_for_other_owner_is_404() {
    let fixture = SqliteFixture::new().await;
    let response = fixture.service().schema("mallory", SOURCE_ID).await;
    assert_eq!(response.status, 404);
    assert!(response.body.tables.is_empty());
}

#[tokio::test]
async fn test_refresh_cache_counts() {
    let fixture = SqliteFixture::new().await;
    let service = fixture.service();

    service
        .run_query(OWNER, SOURCE_ID, &RunQueryRequest::table("customers"))
        .await;
    service
        .run_query(OWNER, SOURCE_ID, &RunQueryRequest::table("invoices"))
        .await;
    service
        .run_query(OWNER, SOURCE_ID, &RunQueryRequest::sql("SELECT 1 AS one"))
        .await;

    let single = service
        .refresh_cache(
            OWNER,
            SOURCE_ID,
            &RefreshCacheRequest {
                table_name: Some("customers".to_string()),
                sql: None,
            },
        )
        .await;
    assert_eq!(single.body.invalidated, 1);

    let all = service
        .refresh_cache(OWNER, SOURCE_ID, &RefreshCacheRequest::default())
        .await;
    assert_eq!(all.body.invalidated, 3);

    let after = service
        .run_query(OWNER, SOURCE_ID, &RunQueryRequest::table("invoices"))
        .await;
    assert!(!after.body.cached);
}

#[tokio::test]
async fn test_connection_checks() {
    let fixture = SqliteFixture::new().await;
    let service = fixture.service();

    let stored = service
        .test_connection(
            OWNER,
            &TestConnectionRequest {
                data_source_id: Some(SOURCE_ID),
                ..Default::default()
            },
        )
        .await;
    assert_eq!(stored.status, 200);
    assert!(stored.body.success);

    let missing_path = fixture.dir.path().join("absent.db");
    let missing = service
        .test_connection(
            OWNER,
            &TestConnectionRequest {
                data_source_id: None,
                db_type: Some("sqlite".to_string()),
                config: Some(DataSourceConfig::sqlite(missing_path.to_string_lossy())),
            },
        )
        .await;
    assert_eq!(missing.status, 400);
    assert!(!missing.body.success);
    assert!(!missing_path.exists());

    let blank = service
        .test_connection(
            OWNER,
            &TestConnectionRequest {
                data_source_id: None,
                db_type: Some("sqlite".to_string()),
                config: Some(DataSourceConfig::new(DatabaseBackend::Sqlite)),
            },
        )
        .await;
    assert_eq!(blank.status, 400);
    assert_eq!(blank.body.message, "File path is required.");
}

#[tokio::test]
async fn test_generated_sql_runs() {
    let fixture = SqliteFixture::new().await;
    let service = fixture.service();

    let generated = service
        .generate_sql(
            OWNER,
            SOURCE_ID,
            &GenerateSqlRequest {
                natural_language: "How many customers signed up?".to_string(),
            },
        )
        .await;
    assert_eq!(generated.status, 200);
    assert_eq!(
        generated.body.generated_sql,
        "SELECT COUNT(*) AS count FROM \"customers\""
    );

    let response = service
        .run_query(
            OWNER,
            SOURCE_ID,
            &RunQueryRequest::sql(generated.body.generated_sql),
        )
        .await;
    assert_eq!(response.body.rows[0]["count"], NormalizedValue::Number(3.into()));
}

#[tokio::test]
async fn test_show_data_source() {
    let fixture = SqliteFixture::new().await;
    let response = fixture.service().data_source(OWNER, SOURCE_ID).await;
    assert_eq!(response.status, 200);
    let DataSourceBody::Found(view) = response.body else {
        panic!("expected data source");
    };
    assert_eq!(view.db_type, DatabaseBackend::Sqlite);
    assert_eq!(view.config.password, None);
}
