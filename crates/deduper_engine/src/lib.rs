//! Deduper engine: page access, discovery, deletion, messaging, upload and
//! snapshot persistence.
mod backend;
mod bus;
mod decode;
mod deletion;
mod discovery;
mod engine;
mod html_page;
mod page;
mod persist;
mod protocol;
mod types;
mod upload;
mod wait;

pub use backend::{AnalysisOptions, BackendClient, BackendSettings};
pub use bus::{
    BusClient, BusError, ContentScript, ContentSettings, InProcessTab, Listener, RuntimeChannel,
    TabMessenger,
};
pub use decode::{decode_snapshot, DecodeError};
pub use deletion::{delete_item, DeletionError, DeletionReceipt, DeletionStage};
pub use discovery::{
    discover_items, extract_items, is_listing_view, item_id_from_url, DiscoveryError,
    DiscoverySettings,
};
pub use engine::{EngineCommand, EngineError, EngineHandle, EngineSettings};
pub use html_page::HtmlPage;
pub use page::{Element, MutationObserver, MutationSource, NodeIndex, Page, PageError};
pub use persist::{ensure_dir, write_atomic, PersistError};
pub use protocol::{
    DeletePhoto, DeletePhotoResult, DiscoverPhotosResult, HealthCheckResult, Message,
    MessageKind, Operation, APP_TAG,
};
pub use types::{
    BackendError, ChannelProgressSink, DiscoveryProgress, EngineEvent, FailureKind,
    NullProgressSink, ProgressSink, UploadProgress,
};
pub use upload::{upload_in_batches, PhotoCollector, StoredBatch, UploadError};
pub use wait::{wait_for_element, WaitError, DEFAULT_WAIT_TIMEOUT};
