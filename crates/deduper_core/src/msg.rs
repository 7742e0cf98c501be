use crate::{ConnectionStatus, DiscoveredItem};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Control surface opened; connection status should be refreshed.
    Opened,
    /// Backend session probe finished.
    ConnectionChecked(ConnectionStatus),
    /// User clicked Discover. `tab_url` is the active tab's URL, if any.
    DiscoverClicked { tab_url: Option<String> },
    /// Content script reported discovery progress.
    DiscoveryProgress {
        photos_discovered: usize,
        current_batch: u32,
    },
    /// Discovery finished with the full collection or an error text.
    DiscoveryFinished(Result<Vec<DiscoveredItem>, String>),
    /// User clicked Send.
    SendClicked,
    /// A batch was accepted by the backend.
    UploadProgress {
        batches_sent: usize,
        total_batches: usize,
        percent: f64,
    },
    /// Upload finished with the number of items sent or an error text.
    UploadFinished(Result<usize, String>),
    /// User clicked Analyze.
    AnalyzeClicked,
    /// Backend answered the analysis request with a task id or an error text.
    AnalysisStarted(Result<String, String>),
    /// An event with no effect on the control surface.
    NoOp,
}
