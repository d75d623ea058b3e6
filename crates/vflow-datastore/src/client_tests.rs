//! Tests for the table API client.

use std::time::Duration;

use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vflow_models::{SceneId, ScenePatch, VideoId, VideoPatch, WorkStatus};

use crate::client::{DataStoreClient, DataStoreConfig};
use crate::error::DataStoreError;
use crate::retry::RetryConfig;
use crate::store::DataStore;

// =============================================================================
// Test Helpers
// =============================================================================

fn test_config(base_url: &str) -> DataStoreConfig {
    DataStoreConfig {
        base_url: base_url.to_string(),
        token: Some("secret".to_string()),
        videos_table: "tv".to_string(),
        scenes_table: "ts".to_string(),
        page_size: 2,
        timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
        retry: RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 5,
        },
    }
}

// =============================================================================
// Error Type Tests
// =============================================================================

#[test]
fn test_error_from_http_status() {
    assert!(matches!(
        DataStoreError::from_http_status(429, "slow down"),
        DataStoreError::RateLimited(_)
    ));
    assert!(matches!(
        DataStoreError::from_http_status(503, "unavailable"),
        DataStoreError::ServerError(503, _)
    ));
    assert!(matches!(
        DataStoreError::from_http_status(404, "missing"),
        DataStoreError::NotFound(_)
    ));
    assert!(matches!(
        DataStoreError::from_http_status(401, "no token"),
        DataStoreError::Unauthorized(_)
    ));
    assert!(!DataStoreError::from_http_status(400, "bad").is_retryable());
    assert!(DataStoreError::from_http_status(500, "boom").is_retryable());
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
#[serial]
fn test_config_requires_url() {
    std::env::remove_var("DATASTORE_URL");
    assert!(DataStoreConfig::from_env().is_err());
}

#[test]
#[serial]
fn test_config_from_env() {
    std::env::set_var("DATASTORE_URL", "https://db.test/");
    std::env::set_var("DATASTORE_VIDEOS_TABLE", "m_videos");
    std::env::remove_var("DATASTORE_SCENES_TABLE");
    std::env::remove_var("DATASTORE_TOKEN");

    let config = DataStoreConfig::from_env().unwrap();
    assert_eq!(config.base_url, "https://db.test");
    assert_eq!(config.videos_table, "m_videos");
    assert_eq!(config.scenes_table, "scenes");
    assert!(config.token.is_none());

    std::env::remove_var("DATASTORE_URL");
    std::env::remove_var("DATASTORE_VIDEOS_TABLE");
}

// =============================================================================
// HTTP Tests
// =============================================================================

#[tokio::test]
async fn test_fetch_all_follows_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/tables/tv/records"))
        .and(query_param("offset", "0"))
        .and(header("xc-token", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [
                {"Id": 1, "status": "Processing", "video_url": [{"url": "https://cdn.test/1.mp4"}]},
                {"Id": 2, "status": "Done"}
            ],
            "pageInfo": {"isLastPage": false}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/tables/tv/records"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{"Id": 3}],
            "pageInfo": {"isLastPage": true}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DataStoreClient::new(test_config(&server.uri())).unwrap();
    let videos = client.fetch_all().await.unwrap();

    assert_eq!(videos.len(), 3);
    assert_eq!(videos[0].video_url.as_deref(), Some("https://cdn.test/1.mp4"));
    assert_eq!(videos[1].status, WorkStatus::Done);
    assert_eq!(videos[2].status, WorkStatus::Pending);
}

#[tokio::test]
async fn test_fetch_retries_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/tables/ts/records"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/tables/ts/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{"Id": 5, "video_id": 1, "sentence": "Hi"}],
            "pageInfo": {"isLastPage": true}
        })))
        .mount(&server)
        .await;

    let client = DataStoreClient::new(test_config(&server.uri())).unwrap();
    let scenes = client.fetch_scenes().await.unwrap();
    assert_eq!(scenes.len(), 1);
    assert_eq!(scenes[0].id, SceneId(5));
}

#[tokio::test]
async fn test_fetch_fails_on_client_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/tables/tv/records"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .expect(1)
        .mount(&server)
        .await;

    let client = DataStoreClient::new(test_config(&server.uri())).unwrap();
    let err = client.fetch_all().await.unwrap_err();
    assert!(matches!(err, DataStoreError::Unauthorized(_)));
}

#[tokio::test]
async fn test_fetch_reports_unparsable_multibyte_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/tables/tv/records"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(format!("{}éé not json", "x".repeat(199))),
        )
        .mount(&server)
        .await;

    let client = DataStoreClient::new(test_config(&server.uri())).unwrap();
    let err = client.fetch_all().await.unwrap_err();
    match err {
        DataStoreError::InvalidResponse(msg) => {
            assert!(msg.ends_with(&format!("{}é)", "x".repeat(199))));
        }
        other => panic!("expected InvalidResponse, got {:?}", other),
    }
}

#[tokio::test]
async fn test_update_sends_partial_body() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/v2/tables/tv/records"))
        .and(body_json(json!({"Id": 7, "order": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Id": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let client = DataStoreClient::new(test_config(&server.uri())).unwrap();
    client.update_video(VideoId(7), &VideoPatch::order(2)).await.unwrap();
}

#[tokio::test]
async fn test_empty_update_is_skipped() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = DataStoreClient::new(test_config(&server.uri())).unwrap();
    client.update_scene(SceneId(1), &ScenePatch::default()).await.unwrap();
}

#[tokio::test]
async fn test_delete_missing_row_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v2/tables/ts/records"))
        .and(body_json(json!({"Id": 4})))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = DataStoreClient::new(test_config(&server.uri())).unwrap();
    client.delete_scene(SceneId(4)).await.unwrap();
}
