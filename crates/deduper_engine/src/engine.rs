use std::io;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use deduper_core::{DiscoveredItem, DEFAULT_CHUNK_SIZE};
use deduper_logging::{deduper_error, deduper_info};
use tokio::sync::mpsc as async_mpsc;

use crate::backend::{AnalysisOptions, BackendClient, BackendSettings};
use crate::bus::BusClient;
use crate::types::ChannelProgressSink;
use crate::upload::upload_in_batches;
use crate::{BackendError, EngineEvent, ProgressSink};

#[derive(Debug, Clone)]
pub enum EngineCommand {
    CheckConnection,
    Discover,
    Upload { photos: Vec<DiscoveredItem> },
    StartAnalysis,
    Delete { media_item_id: String },
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub backend: BackendSettings,
    pub chunk_size: usize,
    pub analysis: AnalysisOptions,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            backend: BackendSettings::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            analysis: AnalysisOptions::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to start engine runtime: {0}")]
    Runtime(#[from] io::Error),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

struct EngineContext {
    bus: BusClient,
    backend: BackendClient,
    settings: EngineSettings,
    event_tx: mpsc::Sender<EngineEvent>,
}

/// Runs control-surface commands on a dedicated single-threaded runtime and
/// hands back events through a channel the caller polls.
pub struct EngineHandle {
    cmd_tx: async_mpsc::UnboundedSender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings, bus: BusClient) -> Result<Self, EngineError> {
        let (cmd_tx, mut cmd_rx) = async_mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel();
        let backend = BackendClient::new(&settings.backend)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let context = Arc::new(EngineContext {
            bus,
            backend,
            settings,
            event_tx,
        });

        thread::spawn(move || {
            runtime.block_on(async move {
                while let Some(command) = cmd_rx.recv().await {
                    let context = Arc::clone(&context);
                    tokio::spawn(async move { handle_command(&context, command).await });
                }
            });
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn enqueue(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            deduper_error!("Engine runtime has stopped; command dropped");
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn handle_command(context: &EngineContext, command: EngineCommand) {
    let sink = ChannelProgressSink::new(context.event_tx.clone());
    let event = match command {
        EngineCommand::CheckConnection => {
            EngineEvent::ConnectionChecked(context.backend.connection_status().await)
        }
        EngineCommand::Discover => EngineEvent::DiscoveryCompleted(context.bus.discover(&sink).await),
        EngineCommand::Upload { photos } => EngineEvent::UploadCompleted(
            upload_in_batches(&context.backend, &photos, context.settings.chunk_size, &sink).await,
        ),
        EngineCommand::StartAnalysis => {
            let result = context.backend.start_analysis(&context.settings.analysis).await;
            if let Ok(task_id) = &result {
                deduper_info!("Analysis started with task {}", task_id);
            }
            EngineEvent::AnalysisStarted(result)
        }
        EngineCommand::Delete { media_item_id } => {
            let result = context.bus.delete_photo(&media_item_id).await;
            EngineEvent::DeletionCompleted {
                media_item_id,
                result,
            }
        }
    };
    sink.emit(event);
}
