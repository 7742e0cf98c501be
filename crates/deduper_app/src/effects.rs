use std::time::Duration;

use deduper_core::{Effect, Msg};
use deduper_engine::{EngineCommand, EngineEvent, EngineHandle};
use deduper_logging::{deduper_info, deduper_warn};

/// What running a batch of effects produced.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Dispatch {
    /// Engine commands now in flight; each answers with one completion event.
    pub commands: usize,
    pub alerts: Vec<String>,
}

pub struct EffectRunner {
    engine: EngineHandle,
    app_url: String,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, app_url: impl Into<String>) -> Self {
        Self {
            engine,
            app_url: app_url.into(),
        }
    }

    pub fn run(&self, effects: Vec<Effect>) -> Dispatch {
        let mut dispatch = Dispatch::default();
        for effect in effects {
            let command = match effect {
                Effect::CheckConnection => EngineCommand::CheckConnection,
                Effect::StartDiscovery => EngineCommand::Discover,
                Effect::UploadPhotos { photos } => {
                    deduper_info!("UploadPhotos count={}", photos.len());
                    EngineCommand::Upload { photos }
                }
                Effect::StartAnalysis => EngineCommand::StartAnalysis,
                Effect::OpenApp => {
                    self.open_app();
                    continue;
                }
                Effect::Alert(text) => {
                    deduper_warn!("Alert: {}", text);
                    dispatch.alerts.push(text);
                    continue;
                }
            };
            self.engine.enqueue(command);
            dispatch.commands += 1;
        }
        dispatch
    }

    pub fn enqueue(&self, command: EngineCommand) {
        self.engine.enqueue(command);
    }

    pub fn next_event(&self, timeout: Duration) -> Option<EngineEvent> {
        self.engine.recv_timeout(timeout)
    }

    /// Drains events until `pick` accepts one, or until `timeout` passes
    /// without any event at all.
    pub fn wait_for<T>(
        &self,
        timeout: Duration,
        mut pick: impl FnMut(EngineEvent) -> Option<T>,
    ) -> Option<T> {
        loop {
            let event = self.next_event(timeout)?;
            if let Some(picked) = pick(event) {
                return Some(picked);
            }
        }
    }

    pub fn open_app(&self) {
        deduper_info!("Opening {}", self.app_url);
        println!("Review duplicates at {}", self.app_url);
    }
}

/// Translates an engine event into the control-surface message it stands for.
pub fn event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::ConnectionChecked(status) => Msg::ConnectionChecked(status),
        EngineEvent::DiscoveryProgress(progress) => Msg::DiscoveryProgress {
            photos_discovered: progress.photos_discovered,
            current_batch: progress.current_batch,
        },
        EngineEvent::DiscoveryCompleted(result) => {
            Msg::DiscoveryFinished(result.map_err(|err| err.to_string()))
        }
        EngineEvent::UploadProgress(progress) => Msg::UploadProgress {
            batches_sent: progress.batches_sent,
            total_batches: progress.total_batches,
            percent: progress.percent,
        },
        EngineEvent::UploadCompleted(result) => {
            Msg::UploadFinished(result.map_err(|err| err.to_string()))
        }
        EngineEvent::AnalysisStarted(result) => {
            Msg::AnalysisStarted(result.map_err(|err| err.message))
        }
        // Deletion has no control-surface state; callers wait for it directly.
        EngineEvent::DeletionCompleted { .. } => Msg::NoOp,
    }
}
