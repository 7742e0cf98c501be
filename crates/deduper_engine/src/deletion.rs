use std::time::Duration;

use chrono::{DateTime, Utc};
use deduper_logging::{deduper_debug, deduper_info, deduper_warn};
use thiserror::Error;

use crate::page::Page;
use crate::wait::wait_for_element;

/// Steps of removing one item through the page's own UI.
///
/// The sequence is linear. A stage that times out ends the run; stages that
/// already acted (clicks) are not undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionStage {
    AwaitingImage,
    AwaitingTrashButton,
    AwaitingConfirmDialog,
    AwaitingToast,
    Done,
}

impl DeletionStage {
    /// Selector gating this stage; `None` once done.
    pub fn selector(self) -> Option<&'static str> {
        match self {
            DeletionStage::AwaitingImage => Some("img[aria-label][src*='usercontent']"),
            DeletionStage::AwaitingTrashButton => Some("[data-delete-origin] button"),
            DeletionStage::AwaitingConfirmDialog => Some("[data-mdc-dialog-button-default]"),
            DeletionStage::AwaitingToast => Some(r#"[role="status"][aria-live="polite"]"#),
            DeletionStage::Done => None,
        }
    }

    fn clicks(self) -> bool {
        matches!(
            self,
            DeletionStage::AwaitingTrashButton | DeletionStage::AwaitingConfirmDialog
        )
    }

    fn next(self) -> DeletionStage {
        match self {
            DeletionStage::AwaitingImage => DeletionStage::AwaitingTrashButton,
            DeletionStage::AwaitingTrashButton => DeletionStage::AwaitingConfirmDialog,
            DeletionStage::AwaitingConfirmDialog => DeletionStage::AwaitingToast,
            DeletionStage::AwaitingToast | DeletionStage::Done => DeletionStage::Done,
        }
    }

    fn failure_reason(self, page: &dyn Page) -> String {
        match self {
            // The page title carries Google's own message ("Can't access photo", 404 pages).
            DeletionStage::AwaitingImage => {
                let title = page.title();
                if title.is_empty() {
                    "Photo not accessible".to_string()
                } else {
                    title
                }
            }
            DeletionStage::AwaitingTrashButton => "Trash button not found".to_string(),
            DeletionStage::AwaitingConfirmDialog => "Confirm button not found".to_string(),
            DeletionStage::AwaitingToast => "Confirmation toaster not found".to_string(),
            DeletionStage::Done => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionReceipt {
    pub media_item_id: String,
    pub deleted_at: DateTime<Utc>,
    pub user_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct DeletionError {
    pub media_item_id: String,
    pub stage: DeletionStage,
    pub reason: String,
}

/// Deletes the item shown on the current detail page.
pub async fn delete_item(
    page: &dyn Page,
    media_item_id: &str,
    wait_timeout: Duration,
) -> Result<DeletionReceipt, DeletionError> {
    let mut stage = DeletionStage::AwaitingImage;
    while let Some(selector) = stage.selector() {
        let acted = match wait_for_element(page, selector, wait_timeout).await {
            Ok(element) if stage.clicks() => page.click(&element).map_err(|err| err.to_string()),
            Ok(_) => Ok(()),
            Err(err) => Err(err.to_string()),
        };
        if let Err(cause) = acted {
            let reason = stage.failure_reason(page);
            deduper_warn!(
                "Deleting {} failed at {:?}: {} ({})",
                media_item_id,
                stage,
                reason,
                cause
            );
            return Err(DeletionError {
                media_item_id: media_item_id.to_string(),
                stage,
                reason,
            });
        }
        deduper_debug!("Deleting {}: {:?} passed", media_item_id, stage);
        stage = stage.next();
    }

    deduper_info!("Deleted {}", media_item_id);
    Ok(DeletionReceipt {
        media_item_id: media_item_id.to_string(),
        deleted_at: Utc::now(),
        user_url: page.location(),
    })
}
