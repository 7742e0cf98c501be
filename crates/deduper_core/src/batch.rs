use serde::Serialize;

use crate::DiscoveredItem;

/// Items per upload request unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// One chunk of the discovered set, serialized as the collector's request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadBatch<'a> {
    #[serde(rename = "photos")]
    pub items: &'a [DiscoveredItem],
    pub batch_number: usize,
    pub total_batches: usize,
    pub is_final: bool,
}

/// Number of batches needed for `len` items. A chunk size of zero is treated as one.
pub fn total_batches(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size.max(1))
}

/// Splits `items` into ordered, 1-based batches; only the last is final.
pub fn partition_batches(items: &[DiscoveredItem], chunk_size: usize) -> Vec<UploadBatch<'_>> {
    let chunk_size = chunk_size.max(1);
    let total = total_batches(items.len(), chunk_size);
    items
        .chunks(chunk_size)
        .enumerate()
        .map(|(index, chunk)| UploadBatch {
            items: chunk,
            batch_number: index + 1,
            total_batches: total,
            is_final: index + 1 == total,
        })
        .collect()
}

/// Percentage of batches delivered so far.
pub fn upload_percent(sent: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    sent as f64 / total as f64 * 100.0
}
