use std::sync::Mutex;

use deduper_core::{DiscoveredItem, UploadBatch};
use deduper_engine::{
    upload_in_batches, BackendError, EngineEvent, FailureKind, NullProgressSink, PhotoCollector,
    ProgressSink, StoredBatch, UploadProgress,
};
use pretty_assertions::assert_eq;

fn items(count: usize) -> Vec<DiscoveredItem> {
    (0..count)
        .map(|k| {
            DiscoveredItem::new(
                format!("id{k:03}"),
                format!("https://photos.google.com/photo/id{k:03}"),
                format!("https://lh3.googleusercontent.com/{k}"),
            )
        })
        .collect()
}

/// Records every call and whether the previous one had already completed.
#[derive(Default)]
struct FakeCollector {
    fail_on: Option<usize>,
    in_call: Mutex<bool>,
    calls: Mutex<Vec<(usize, usize, bool, Vec<String>)>>,
}

#[async_trait::async_trait]
impl PhotoCollector for FakeCollector {
    async fn store_batch(&self, batch: &UploadBatch<'_>) -> Result<StoredBatch, BackendError> {
        {
            let mut busy = self.in_call.lock().unwrap();
            assert!(!*busy, "batch {} sent before the previous answer", batch.batch_number);
            *busy = true;
        }
        tokio::task::yield_now().await;

        let stored = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((
                batch.batch_number,
                batch.total_batches,
                batch.is_final,
                batch.items.iter().map(|i| i.id.clone()).collect(),
            ));
            calls.iter().map(|c| c.3.len()).sum::<usize>() as u64
        };
        *self.in_call.lock().unwrap() = false;

        if self.fail_on == Some(batch.batch_number) {
            return Err(BackendError {
                kind: FailureKind::HttpStatus(500),
                message: "500 Internal Server Error".to_string(),
            });
        }
        Ok(StoredBatch {
            total_stored: stored,
        })
    }
}

#[derive(Default)]
struct ProgressLog(Mutex<Vec<UploadProgress>>);

impl ProgressSink for ProgressLog {
    fn emit(&self, event: EngineEvent) {
        if let EngineEvent::UploadProgress(progress) = event {
            self.0.lock().unwrap().push(progress);
        }
    }
}

#[tokio::test]
async fn sends_batches_in_order_one_at_a_time() {
    deduper_logging::initialize_for_tests();
    let collector = FakeCollector::default();
    let progress = ProgressLog::default();
    let photos = items(250);

    let sent = upload_in_batches(&collector, &photos, 100, &progress)
        .await
        .unwrap();

    assert_eq!(sent, 250);
    let calls = collector.calls.lock().unwrap();
    let shape: Vec<(usize, usize, bool, usize)> = calls
        .iter()
        .map(|(n, t, last, ids)| (*n, *t, *last, ids.len()))
        .collect();
    assert_eq!(
        shape,
        vec![(1, 3, false, 100), (2, 3, false, 100), (3, 3, true, 50)]
    );
    assert_eq!(calls[1].3.first().map(String::as_str), Some("id100"));
    assert_eq!(calls[2].3.last().map(String::as_str), Some("id249"));

    let reported: Vec<(usize, u64)> = progress
        .0
        .lock()
        .unwrap()
        .iter()
        .map(|p| (p.batches_sent, p.total_stored))
        .collect();
    assert_eq!(reported, vec![(1, 100), (2, 200), (3, 250)]);
    let last = progress.0.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.percent, 100.0);
}

#[tokio::test]
async fn first_failure_stops_the_upload() {
    let collector = FakeCollector {
        fail_on: Some(2),
        ..FakeCollector::default()
    };
    let progress = ProgressLog::default();

    let err = upload_in_batches(&collector, &items(250), 100, &progress)
        .await
        .unwrap_err();

    assert_eq!(err.batch_number, 2);
    assert_eq!(err.total_batches, 3);
    assert_eq!(
        err.to_string(),
        "Failed to send batch 2/3: http status 500: 500 Internal Server Error"
    );
    let numbers: Vec<usize> = collector.calls.lock().unwrap().iter().map(|c| c.0).collect();
    assert_eq!(numbers, vec![1, 2]);
    // Only the acknowledged batch is reported as progress.
    assert_eq!(progress.0.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn nothing_to_send_sends_nothing() {
    let collector = FakeCollector::default();
    let sent = upload_in_batches(&collector, &[], 100, &NullProgressSink)
        .await
        .unwrap();
    assert_eq!(sent, 0);
    assert!(collector.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn exact_multiple_marks_only_last_batch_final() {
    let collector = FakeCollector::default();
    upload_in_batches(&collector, &items(200), 100, &NullProgressSink)
        .await
        .unwrap();
    let finals: Vec<bool> = collector.calls.lock().unwrap().iter().map(|c| c.2).collect();
    assert_eq!(finals, vec![false, true]);
}
