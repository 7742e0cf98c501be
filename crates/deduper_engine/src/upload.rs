use deduper_core::{partition_batches, upload_percent, DiscoveredItem, UploadBatch};
use deduper_logging::{deduper_error, deduper_info};
use serde::Deserialize;
use thiserror::Error;

use crate::{BackendError, EngineEvent, ProgressSink, UploadProgress};

/// Collector's acknowledgement of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoredBatch {
    pub total_stored: u64,
}

#[async_trait::async_trait]
pub trait PhotoCollector: Send + Sync {
    async fn store_batch(&self, batch: &UploadBatch<'_>) -> Result<StoredBatch, BackendError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to send batch {batch_number}/{total_batches}: {source}")]
pub struct UploadError {
    pub batch_number: usize,
    pub total_batches: usize,
    pub source: BackendError,
}

/// Sends `items` to `collector` in order, `chunk_size` at a time.
///
/// A batch is only sent after the previous one was acknowledged. The first
/// failure stops the upload; nothing after it is sent and nothing is retried.
/// Returns the number of items delivered.
pub async fn upload_in_batches(
    collector: &dyn PhotoCollector,
    items: &[DiscoveredItem],
    chunk_size: usize,
    sink: &dyn ProgressSink,
) -> Result<usize, UploadError> {
    let batches = partition_batches(items, chunk_size);
    let total_batches = batches.len();

    for batch in &batches {
        deduper_info!(
            "Sending batch {}/{} ({} photos)",
            batch.batch_number,
            total_batches,
            batch.items.len()
        );
        let stored = collector.store_batch(batch).await.map_err(|source| {
            deduper_error!("Batch {} rejected: {}", batch.batch_number, source);
            UploadError {
                batch_number: batch.batch_number,
                total_batches,
                source,
            }
        })?;
        deduper_info!(
            "Batch {} sent. Total stored: {}",
            batch.batch_number,
            stored.total_stored
        );
        sink.emit(EngineEvent::UploadProgress(UploadProgress {
            batches_sent: batch.batch_number,
            total_batches,
            percent: upload_percent(batch.batch_number, total_batches),
            total_stored: stored.total_stored,
        }));
    }

    Ok(items.len())
}
