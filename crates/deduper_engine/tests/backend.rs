use std::time::Duration;

use deduper_core::{partition_batches, ConnectionStatus, DiscoveredItem, ItemDimensions};
use deduper_engine::{
    AnalysisOptions, BackendClient, BackendSettings, FailureKind, PhotoCollector, StoredBatch,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn client_for(server: &MockServer) -> BackendClient {
    BackendClient::new(&BackendSettings {
        base_url: server.uri(),
        session_cookie: Some("session=abc".to_string()),
        ..BackendSettings::default()
    })
    .expect("client")
}

fn photo(id: &str) -> DiscoveredItem {
    DiscoveredItem::new(
        id,
        format!("https://photos.google.com/photo/{id}"),
        format!("https://lh3.googleusercontent.com/{id}"),
    )
    .with_display_name(Some("IMG_0001.jpg"))
    .with_dimensions(ItemDimensions::new(Some(4032), Some(3024)))
}

#[tokio::test]
async fn store_batch_posts_wire_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/extension/photos"))
        .and(header("cookie", "session=abc"))
        .and(body_partial_json(json!({
            "batch_number": 2,
            "total_batches": 2,
            "is_final": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "total_stored": 3 })))
        .expect(1)
        .mount(&server)
        .await;

    let photos = vec![photo("a"), photo("b"), photo("c")];
    let batches = partition_batches(&photos, 2);
    let stored = client_for(&server).store_batch(&batches[1]).await.unwrap();
    assert_eq!(stored, StoredBatch { total_stored: 3 });

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(
        body["photos"][0],
        json!({
            "id": "c",
            "productUrl": "https://photos.google.com/photo/c",
            "baseUrl": "https://lh3.googleusercontent.com/c",
            "filename": "IMG_0001.jpg",
            "mimeType": "image/jpeg",
            "mediaMetadata": { "width": "4032", "height": "3024" }
        })
    );
}

#[tokio::test]
async fn store_batch_reports_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/extension/photos"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let photos = vec![photo("a")];
    let batches = partition_batches(&photos, 100);
    let err = client_for(&server)
        .store_batch(&batches[0])
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(401));
    assert_eq!(err.message, "401 Unauthorized");
}

#[tokio::test]
async fn store_batch_surfaces_backend_error_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/extension/photos"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "not_logged_in" })))
        .mount(&server)
        .await;

    let photos = vec![photo("a")];
    let batches = partition_batches(&photos, 100);
    let err = client_for(&server)
        .store_batch(&batches[0])
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(401));
    assert_eq!(err.message, "not_logged_in");
}

#[tokio::test]
async fn base_path_prefix_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/deduper/auth/me"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = BackendClient::new(&BackendSettings {
        base_url: format!("{}/deduper", server.uri()),
        ..BackendSettings::default()
    })
    .unwrap();
    assert_eq!(client.connection_status().await, ConnectionStatus::Connected);
}

#[tokio::test]
async fn start_analysis_returns_task_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/extension/analyze"))
        .and(body_partial_json(json!({
            "resolution": 224,
            "similarity_threshold": 0.9,
            "download_original": false,
            "chunk_size": 1000
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "task_id": "t-42" })))
        .mount(&server)
        .await;

    let task = client_for(&server)
        .start_analysis(&AnalysisOptions::default())
        .await
        .unwrap();
    assert_eq!(task, "t-42");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert!(body.get("image_store_path").is_none());
}

#[tokio::test]
async fn start_analysis_prefers_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/extension/analyze"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "No photos uploaded" })),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .start_analysis(&AnalysisOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(400));
    assert_eq!(err.message, "No photos uploaded");
}

#[tokio::test]
async fn connection_status_distinguishes_login_from_reachability() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(|request: &Request| {
            let logged_in = request
                .headers
                .get("cookie")
                .is_some_and(|value| value.as_bytes() == b"session=abc");
            ResponseTemplate::new(if logged_in { 200 } else { 401 })
        })
        .mount(&server)
        .await;

    assert_eq!(
        client_for(&server).connection_status().await,
        ConnectionStatus::Connected
    );
    let anonymous = BackendClient::new(&BackendSettings {
        base_url: server.uri(),
        ..BackendSettings::default()
    })
    .unwrap();
    assert_eq!(
        anonymous.connection_status().await,
        ConnectionStatus::NotLoggedIn
    );

    // A port that was just released has nobody listening on it.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let gone = BackendClient::new(&BackendSettings {
        base_url: format!("http://127.0.0.1:{port}"),
        connect_timeout: Duration::from_millis(500),
        request_timeout: Duration::from_secs(1),
        session_cookie: None,
    })
    .unwrap();
    assert_eq!(gone.connection_status().await, ConnectionStatus::Unreachable);
}

#[test]
fn rejects_malformed_base_url() {
    let err = BackendClient::new(&BackendSettings {
        base_url: "not a url".to_string(),
        ..BackendSettings::default()
    })
    .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
