use std::sync::{Arc, Mutex};
use std::time::Duration;

use deduper_core::DiscoveredItem;
use deduper_engine::{
    BusClient, BusError, ContentScript, ContentSettings, DeletePhotoResult, DiscoverPhotosResult,
    DiscoveryProgress, DiscoverySettings, EngineEvent, HtmlPage, InProcessTab, Message,
    MessageKind, Operation, ProgressSink, RuntimeChannel, TabMessenger, APP_TAG,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const LISTING: &str = r#"
<html><head><title>Photos</title></head><body><div role="main">
  <a href="/photo/one"><img src="https://lh3.googleusercontent.com/1"></a>
  <a href="/photo/two"><img src="https://lh3.googleusercontent.com/2"></a>
</div></body></html>
"#;

#[test]
fn messages_round_trip_through_the_wire_shape() {
    let wire = Message::DiscoverPhotosProgress(DiscoveryProgress {
        photos_discovered: 42,
        current_batch: 3,
    })
    .to_wire()
    .unwrap();
    assert_eq!(
        wire,
        json!({
            "app": APP_TAG,
            "action": "discoverPhotos.progress",
            "photosDiscovered": 42,
            "currentBatch": 3
        })
    );

    let request = Message::DiscoverPhotos.to_wire().unwrap();
    assert_eq!(request, json!({ "app": "GooglePhotosDeduper", "action": "discoverPhotos" }));
    assert_eq!(Message::from_wire(&request), Some(Message::DiscoverPhotos));
}

#[test]
fn result_payloads_are_tagged_by_success() {
    let failed = Message::DiscoverPhotosResult(DiscoverPhotosResult::from_outcome::<String>(Err(
        "Not on Google Photos page".to_string(),
    )))
    .to_wire()
    .unwrap();
    assert_eq!(
        failed,
        json!({
            "app": APP_TAG,
            "action": "discoverPhotos.result",
            "success": false,
            "error": "Not on Google Photos page"
        })
    );

    let photo = DiscoveredItem::new("a", "https://photos.google.com/photo/a", "t");
    let ok = Message::DiscoverPhotosResult(DiscoverPhotosResult::from_outcome::<String>(Ok(
        vec![photo],
    )))
    .to_wire()
    .unwrap();
    assert_eq!(ok["success"], true);
    assert_eq!(ok["totalPhotos"], 1);
    assert_eq!(ok["photos"][0]["productUrl"], "https://photos.google.com/photo/a");

    let deleted: Message = Message::from_wire(&json!({
        "app": APP_TAG,
        "action": "deletePhoto.result",
        "success": true,
        "mediaItemId": "a",
        "deletedAt": "2024-05-01T10:00:00Z",
        "userUrl": "https://photos.google.com/photo/a"
    }))
    .unwrap();
    let Message::DeletePhotoResult(result) = deleted else {
        panic!("unexpected message");
    };
    let receipt = result.into_result().unwrap();
    assert_eq!(receipt.media_item_id, "a");
    assert_eq!(receipt.deleted_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
}

#[test]
fn untagged_or_unknown_messages_are_ignored() {
    assert_eq!(Message::from_wire(&json!({ "action": "discoverPhotos" })), None);
    assert_eq!(
        Message::from_wire(&json!({ "app": "OtherExtension", "action": "discoverPhotos" })),
        None
    );
    assert_eq!(
        Message::from_wire(&json!({ "app": APP_TAG, "action": "startDeletionTask" })),
        None
    );
    assert_eq!(Message::from_wire(&json!("discoverPhotos")), None);
}

#[test]
fn operation_and_kind_classify_actions() {
    let progress = Message::DiscoverPhotosProgress(DiscoveryProgress {
        photos_discovered: 0,
        current_batch: 1,
    });
    assert_eq!(progress.operation(), Operation::Discover);
    assert_eq!(progress.kind(), MessageKind::Progress);
    let result = Message::DeletePhotoResult(DeletePhotoResult {
        success: false,
        media_item_id: "x".into(),
        deleted_at: None,
        user_url: None,
        error: Some("Trash button not found".into()),
    });
    assert_eq!(result.operation(), Operation::Delete);
    assert_eq!(result.kind(), MessageKind::Result);
}

#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<EngineEvent>>,
}

impl ProgressSink for EventLog {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn fast_settings() -> ContentSettings {
    ContentSettings {
        discovery: DiscoverySettings {
            settle_delay: Duration::from_millis(10),
            ..DiscoverySettings::default()
        },
        wait_timeout: Duration::from_millis(200),
        version: "9.9.9".to_string(),
    }
}

fn wire_up(page: HtmlPage) -> (RuntimeChannel, Arc<InProcessTab>, BusClient) {
    let runtime = RuntimeChannel::new();
    let content = ContentScript::new(Arc::new(page), runtime.clone(), fast_settings());
    let tab = Arc::new(InProcessTab::new(content));
    let client = BusClient::new(runtime.clone(), tab.clone());
    (runtime, tab, client)
}

#[tokio::test(start_paused = true)]
async fn discover_streams_progress_then_one_result() {
    deduper_logging::initialize_for_tests();
    let (runtime, _tab, client) = wire_up(HtmlPage::new("https://photos.google.com/", LISTING));
    let log = EventLog::default();

    let photos = client.discover(&log).await.unwrap();

    assert_eq!(photos.len(), 2);
    let batches: Vec<u32> = log
        .events
        .lock()
        .unwrap()
        .iter()
        .map(|event| match event {
            EngineEvent::DiscoveryProgress(progress) => progress.current_batch,
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    assert_eq!(batches, vec![1, 2, 3]);
    // The invocation's listener is gone once the result arrived.
    assert_eq!(runtime.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_discovery_surfaces_error_text() {
    let (_runtime, _tab, client) = wire_up(HtmlPage::new("https://example.com/", LISTING));
    let err = client.discover(&EventLog::default()).await.unwrap_err();
    assert_eq!(
        err,
        BusError::Failed("Not on Google Photos page (https://example.com/)".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn no_receiver_fails_and_unregisters() {
    let (runtime, tab, client) = wire_up(HtmlPage::new("https://photos.google.com/", LISTING));
    tab.detach();
    assert_eq!(tab.active_url(), None);

    let err = client.discover(&EventLog::default()).await.unwrap_err();
    assert_eq!(err, BusError::NoReceiver);
    assert_eq!(runtime.listener_count(), 0);

    // The failed attempt does not leave the operation marked busy.
    let err = client.discover(&EventLog::default()).await.unwrap_err();
    assert_eq!(err, BusError::NoReceiver);
    assert_eq!(client.health_check().await.unwrap_err(), BusError::NoReceiver);
}

#[tokio::test(start_paused = true)]
async fn concurrent_same_operation_is_refused() {
    let (_runtime, _tab, client) = wire_up(HtmlPage::new("https://photos.google.com/", LISTING));
    let log = EventLog::default();
    let second = client.clone();

    let (first, rejected) = tokio::join!(client.discover(&log), async {
        tokio::task::yield_now().await;
        second.discover(&EventLog::default()).await
    });

    assert_eq!(first.unwrap().len(), 2);
    assert_eq!(rejected.unwrap_err(), BusError::AlreadyInFlight(Operation::Discover));
    // Once finished, the same operation can run again.
    assert_eq!(client.discover(&log).await.unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn foreign_traffic_does_not_disturb_an_invocation() {
    let (runtime, _tab, client) = wire_up(HtmlPage::new("https://photos.google.com/", LISTING));
    let log = EventLog::default();
    let (photos, ()) = tokio::join!(client.discover(&log), async {
        tokio::task::yield_now().await;
        runtime.broadcast(json!({ "action": "discoverPhotos.result", "success": false, "error": "spoof" }));
        runtime.broadcast(json!({
            "app": APP_TAG,
            "action": "deletePhoto.result",
            "success": false,
            "mediaItemId": "zzz",
            "error": "unrelated"
        }));
    });
    assert_eq!(photos.unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn health_check_reports_version() {
    let (_runtime, tab, client) = wire_up(HtmlPage::new("https://photos.google.com/", LISTING));
    assert_eq!(client.health_check().await.unwrap(), "9.9.9");
    assert_eq!(tab.active_url().as_deref(), Some("https://photos.google.com/"));
}

#[tokio::test(start_paused = true)]
async fn delete_request_returns_stage_failure() {
    let (_runtime, _tab, client) = wire_up(HtmlPage::new(
        "https://photos.google.com/photo/one",
        "<html><head><title>Can't access photo</title></head><body></body></html>",
    ));
    let err = client.delete_photo("one").await.unwrap_err();
    assert_eq!(err, BusError::Failed("Can't access photo".to_string()));
}
