use std::fmt;
use std::sync::mpsc;

use deduper_core::{ConnectionStatus, DiscoveredItem};
use serde::{Deserialize, Serialize};

use crate::bus::BusError;
use crate::deletion::DeletionReceipt;
use crate::upload::UploadError;

/// Running total reported after every discovery iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryProgress {
    pub photos_discovered: usize,
    pub current_batch: u32,
}

/// Reported after each batch the collector accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadProgress {
    pub batches_sent: usize,
    pub total_batches: usize,
    pub percent: f64,
    pub total_stored: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ConnectionChecked(ConnectionStatus),
    DiscoveryProgress(DiscoveryProgress),
    DiscoveryCompleted(Result<Vec<DiscoveredItem>, BusError>),
    UploadProgress(UploadProgress),
    UploadCompleted(Result<usize, UploadError>),
    AnalysisStarted(Result<String, BackendError>),
    DeletionCompleted {
        media_item_id: String,
        result: Result<DeletionReceipt, BusError>,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Sink for callers that do not care about intermediate progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: EngineEvent) {}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: FailureKind,
    pub message: String,
}

impl BackendError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    InvalidConfig,
    HttpStatus(u16),
    Timeout,
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::InvalidConfig => write!(f, "invalid configuration"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
