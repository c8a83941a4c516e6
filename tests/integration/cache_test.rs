//! Persistent cache shared by separate service instances.

use super::common::{SqliteFixture, OWNER, SOURCE_ID};
use flow_reports::api::{QueryService, RefreshCacheRequest, RunQueryRequest};
use flow_reports::config::{CacheConfig, Config, DataSourceRecord};
use pretty_assertions::assert_eq;
use std::path::Path;

async fn open_service(fixture: &SqliteFixture, cache_path: &Path) -> QueryService {
    let config = Config {
        cache: CacheConfig {
            path: Some(cache_path.to_path_buf()),
            ..Default::default()
        },
        data_sources: vec![DataSourceRecord {
            id: SOURCE_ID,
            owner: OWNER.to_string(),
            name: "fixture".to_string(),
            config: fixture.config.clone(),
        }],
        ..Default::default()
    };
    QueryService::open(&config).await.unwrap()
}

#[tokio::test]
async fn test_cached_results_outlive_the_service() {
    let fixture = SqliteFixture::new().await;
    let cache_path = fixture.dir.path().join("state").join("cache.db");
    let request = RunQueryRequest::table("customers");

    let first = open_service(&fixture, &cache_path)
        .await
        .run_query(OWNER, SOURCE_ID, &request)
        .await;
    assert_eq!(first.status, 200, "{:?}", first.body.error);
    assert!(!first.body.cached);
    assert!(cache_path.exists());

    let second = open_service(&fixture, &cache_path)
        .await
        .run_query(OWNER, SOURCE_ID, &request)
        .await;
    assert!(second.body.cached);
    assert_eq!(second.body.rows, first.body.rows);
}

#[tokio::test]
async fn test_refresh_from_another_service_clears_entries() {
    let fixture = SqliteFixture::new().await;
    let cache_path = fixture.dir.path().join("cache.db");

    let writer = open_service(&fixture, &cache_path).await;
    writer
        .run_query(OWNER, SOURCE_ID, &RunQueryRequest::table("customers"))
        .await;
    writer
        .run_query(OWNER, SOURCE_ID, &RunQueryRequest::sql("SELECT 1 AS one"))
        .await;

    let refreshed = open_service(&fixture, &cache_path)
        .await
        .refresh_cache(OWNER, SOURCE_ID, &RefreshCacheRequest::default())
        .await;
    assert_eq!(refreshed.status, 200);
    assert_eq!(refreshed.body.invalidated, 2);

    let after = open_service(&fixture, &cache_path)
        .await
        .run_query(OWNER, SOURCE_ID, &RunQueryRequest::table("customers"))
        .await;
    assert!(!after.body.cached);
}
