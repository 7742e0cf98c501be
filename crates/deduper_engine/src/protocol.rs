//! Messages exchanged between the control surface and the content script.
//!
//! Every message is a JSON object carrying the [`APP_TAG`] origin marker and
//! an `action` naming the operation and, for replies, its kind
//! (`discoverPhotos`, `discoverPhotos.progress`, `discoverPhotos.result`).
//! Objects without the marker belong to someone else and are ignored.

use chrono::{DateTime, Utc};
use deduper_core::DiscoveredItem;
use deduper_logging::deduper_debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::deletion::{DeletionError, DeletionReceipt};
use crate::DiscoveryProgress;

pub const APP_TAG: &str = "GooglePhotosDeduper";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    HealthCheck,
    Discover,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Progress,
    Result,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Message {
    #[serde(rename = "healthCheck")]
    HealthCheck,
    #[serde(rename = "healthCheck.result")]
    HealthCheckResult(HealthCheckResult),
    #[serde(rename = "discoverPhotos")]
    DiscoverPhotos,
    #[serde(rename = "discoverPhotos.progress")]
    DiscoverPhotosProgress(DiscoveryProgress),
    #[serde(rename = "discoverPhotos.result")]
    DiscoverPhotosResult(DiscoverPhotosResult),
    #[serde(rename = "deletePhoto")]
    DeletePhoto(DeletePhoto),
    #[serde(rename = "deletePhoto.result")]
    DeletePhotoResult(DeletePhotoResult),
}

impl Message {
    pub fn operation(&self) -> Operation {
        match self {
            Message::HealthCheck | Message::HealthCheckResult(_) => Operation::HealthCheck,
            Message::DiscoverPhotos
            | Message::DiscoverPhotosProgress(_)
            | Message::DiscoverPhotosResult(_) => Operation::Discover,
            Message::DeletePhoto(_) | Message::DeletePhotoResult(_) => Operation::Delete,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::HealthCheck | Message::DiscoverPhotos | Message::DeletePhoto(_) => {
                MessageKind::Request
            }
            Message::DiscoverPhotosProgress(_) => MessageKind::Progress,
            Message::HealthCheckResult(_)
            | Message::DiscoverPhotosResult(_)
            | Message::DeletePhotoResult(_) => MessageKind::Result,
        }
    }

    /// JSON form with the origin marker attached.
    pub fn to_wire(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(fields) = &mut value {
            fields.insert("app".to_string(), Value::String(APP_TAG.to_string()));
        }
        Ok(value)
    }

    /// Parses a raw runtime message. Returns `None` for foreign or unknown messages.
    pub fn from_wire(raw: &Value) -> Option<Message> {
        if raw.get("app").and_then(Value::as_str) != Some(APP_TAG) {
            return None;
        }
        let mut fields = raw.as_object()?.clone();
        fields.remove("app");
        match serde_json::from_value(Value::Object(fields)) {
            Ok(message) => Some(message),
            Err(err) => {
                deduper_debug!("Ignoring unrecognised message {}: {}", raw, err);
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub success: bool,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePhoto {
    pub media_item_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverPhotosResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_photos: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<DiscoveredItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DiscoverPhotosResult {
    pub fn from_outcome<E: ToString>(outcome: Result<Vec<DiscoveredItem>, E>) -> Self {
        match outcome {
            Ok(photos) => Self {
                success: true,
                total_photos: Some(photos.len()),
                photos: Some(photos),
                error: None,
            },
            Err(err) => Self {
                success: false,
                total_photos: None,
                photos: None,
                error: Some(err.to_string()),
            },
        }
    }

    pub fn into_result(self) -> Result<Vec<DiscoveredItem>, String> {
        if self.success {
            Ok(self.photos.unwrap_or_default())
        } else {
            Err(self.error.unwrap_or_else(|| "unknown error".to_string()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePhotoResult {
    pub success: bool,
    pub media_item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeletePhotoResult {
    pub fn from_outcome(outcome: Result<DeletionReceipt, DeletionError>) -> Self {
        match outcome {
            Ok(receipt) => Self {
                success: true,
                media_item_id: receipt.media_item_id,
                deleted_at: Some(receipt.deleted_at),
                user_url: Some(receipt.user_url),
                error: None,
            },
            Err(err) => Self {
                success: false,
                media_item_id: err.media_item_id,
                deleted_at: None,
                user_url: None,
                error: Some(err.reason),
            },
        }
    }

    pub fn into_result(self) -> Result<DeletionReceipt, String> {
        match (self.success, self.deleted_at) {
            (true, Some(deleted_at)) => Ok(DeletionReceipt {
                media_item_id: self.media_item_id,
                deleted_at,
                user_url: self.user_url.unwrap_or_default(),
            }),
            (true, None) => Err("deletion result without a timestamp".to_string()),
            (false, _) => Err(self.error.unwrap_or_else(|| "unknown error".to_string())),
        }
    }
}
