//! Deduper core: data model, discovery accumulator, batch partitioning and the
//! pure control-surface state machine.
mod batch;
mod discovery;
mod effect;
mod item;
mod msg;
mod state;
mod update;
mod view_model;

pub use batch::{partition_batches, total_batches, upload_percent, UploadBatch, DEFAULT_CHUNK_SIZE};
pub use discovery::{ConvergenceRule, DiscoveryState, MAX_UNCHANGED_ITERATIONS};
pub use effect::Effect;
pub use item::{fallback_display_name, DiscoveredItem, ItemDimensions, DEFAULT_MIME_TYPE};
pub use msg::Msg;
pub use state::{AppState, ConnectionStatus, PHOTOS_HOST};
pub use update::update;
pub use view_model::{AppViewModel, ProgressLine, Tone};
