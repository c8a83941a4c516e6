//! Connection tests.
//!
//! The unreachable-server cases run everywhere; the live cases skip unless
//! DATABASE_URL or MYSQL_URL is set.

use super::common::{live_config, service_for, OWNER, SOURCE_ID};
use flow_reports::api::TestConnectionRequest;
use flow_reports::config::{DataSourceConfig, EngineConfig};
use flow_reports::db::DatabaseBackend;
use flow_reports::query::CONNECTION_OK;

fn by_id() -> TestConnectionRequest {
    TestConnectionRequest {
        data_source_id: Some(SOURCE_ID),
        ..Default::default()
    }
}

fn short_timeouts() -> EngineConfig {
    EngineConfig {
        query_connect_timeout_secs: 2,
        test_connect_timeout_secs: 2,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_live_postgres_connection() {
    let Some(config) = live_config("DATABASE_URL") else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let response = service_for(config, EngineConfig::default())
        .test_connection(OWNER, &by_id())
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body.message, CONNECTION_OK);
}

#[tokio::test]
async fn test_live_mysql_connection() {
    let Some(config) = live_config("MYSQL_URL") else {
        eprintln!("Skipping test: MYSQL_URL not set");
        return;
    };

    let response = service_for(config, EngineConfig::default())
        .test_connection(OWNER, &by_id())
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body.message, CONNECTION_OK);
}

#[tokio::test(flavor = "current_thread")]
async fn test_unresolvable_host() {
    for kind in [DatabaseBackend::Postgres, DatabaseBackend::MySql] {
        let config = DataSourceConfig {
            kind,
            host: Some("invalid.host.that.does.not.exist.local".to_string()),
            database: Some("testdb".to_string()),
            user: Some("testuser".to_string()),
            password: Some("testpass".to_string()),
            ..Default::default()
        };

        let response = service_for(config, short_timeouts())
            .test_connection(OWNER, &by_id())
            .await;
        assert_eq!(response.status, 400);
        assert!(!response.body.success);
        assert!(!response.body.message.is_empty());
        assert!(!response.body.message.contains("testpass"));
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_refused_port() {
    let config = DataSourceConfig {
        kind: DatabaseBackend::Postgres,
        host: Some("127.0.0.1".to_string()),
        port: Some(1),
        database: Some("testdb".to_string()),
        ..Default::default()
    };

    let response = service_for(config, short_timeouts())
        .test_connection(OWNER, &by_id())
        .await;
    assert_eq!(response.status, 400);
    assert!(!response.body.success);
}

#[tokio::test]
async fn test_missing_database_name_is_rejected_before_connecting() {
    let config = DataSourceConfig::new(DatabaseBackend::MySql);
    let response = service_for(config, short_timeouts())
        .test_connection(OWNER, &by_id())
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(response.body.message, "Database name is required.");
}
