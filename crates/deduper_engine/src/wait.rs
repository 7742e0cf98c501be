use std::time::Duration;

use deduper_logging::deduper_trace;
use thiserror::Error;

use crate::page::{Element, MutationObserver, Page, PageError};

pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(10_000);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    #[error("Timeout: selector `{selector}` not found after {}ms", .timeout.as_millis())]
    Timeout { selector: String, timeout: Duration },
    #[error(transparent)]
    Page(#[from] PageError),
}

/// Resolves with the first element matching `selector`.
///
/// Checks once up front, then re-checks after every mutation batch until
/// `timeout` elapses. The observer and the timer are both released when this
/// returns, whichever way it ends.
pub async fn wait_for_element(
    page: &dyn Page,
    selector: &str,
    timeout: Duration,
) -> Result<Element, WaitError> {
    // Subscribe before the first check so a mutation in between is not missed.
    let observer = page.observe_mutations();
    if let Some(element) = page.query(selector)? {
        return Ok(element);
    }

    match tokio::time::timeout(timeout, watch_for(page, selector, observer)).await {
        Ok(found) => found,
        Err(_) => {
            deduper_trace!("wait for `{}` timed out after {:?}", selector, timeout);
            Err(WaitError::Timeout {
                selector: selector.to_string(),
                timeout,
            })
        }
    }
}

async fn watch_for(
    page: &dyn Page,
    selector: &str,
    mut observer: MutationObserver,
) -> Result<Element, WaitError> {
    loop {
        if !observer.next_batch().await {
            // The page stopped publishing mutations; only the timer can end this.
            std::future::pending::<()>().await;
        }
        if let Some(element) = page.query(selector)? {
            return Ok(element);
        }
    }
}
