use std::time::Duration;

use deduper_core::{
    ConvergenceRule, DiscoveredItem, DiscoveryState, ItemDimensions, MAX_UNCHANGED_ITERATIONS,
};
use deduper_logging::{deduper_debug, deduper_info, deduper_warn};
use thiserror::Error;
use url::Url;

use crate::page::{Element, Page, PageError};
use crate::{DiscoveryProgress, EngineEvent, ProgressSink};

#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// Host the page must be served from.
    pub host: String,
    /// Path prefix of the listing view.
    pub listing_path: String,
    /// Link clicked to get back to the listing view.
    pub listing_link_selector: String,
    /// Anchors that may point at an item detail page.
    pub item_link_selector: String,
    /// Scrollable container; `body` is used when it is absent.
    pub scroll_container_selector: String,
    /// Pause after each scroll for lazy content to load.
    pub settle_delay: Duration,
    /// Pause after the corrective navigation click.
    pub navigation_delay: Duration,
    pub max_unchanged_iterations: u32,
    pub convergence: ConvergenceRule,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            host: "photos.google.com".to_string(),
            listing_path: "/photos".to_string(),
            listing_link_selector: r#"a[href^="/photos"]"#.to_string(),
            item_link_selector: r#"a[href*="/photo"]"#.to_string(),
            scroll_container_selector: r#"[role="main"]"#.to_string(),
            settle_delay: Duration::from_millis(1500),
            navigation_delay: Duration::from_millis(2000),
            max_unchanged_iterations: MAX_UNCHANGED_ITERATIONS,
            convergence: ConvergenceRule::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("Not on Google Photos page ({location})")]
    NotOnExpectedPage { location: String },
    #[error("no scrollable container on the page")]
    NoScrollContainer,
    #[error(transparent)]
    Page(#[from] PageError),
}

/// Scrolls through the listing until no new items show up and returns every
/// distinct item seen. Progress is emitted once per iteration.
pub async fn discover_items(
    page: &dyn Page,
    settings: &DiscoverySettings,
    sink: &dyn ProgressSink,
) -> Result<Vec<DiscoveredItem>, DiscoveryError> {
    deduper_info!("Starting to discover photos on {}", page.location());
    ensure_listing_view(page, settings).await?;

    let mut state = DiscoveryState::new(settings.convergence, settings.max_unchanged_iterations);
    while !state.is_converged() {
        let iteration = state.begin_iteration();
        let fresh = state.merge(extract_items(page, settings)?);
        deduper_info!(
            "Batch {}: Found {} total photos ({} new)",
            iteration,
            state.len(),
            fresh
        );
        sink.emit(EngineEvent::DiscoveryProgress(DiscoveryProgress {
            photos_discovered: state.len(),
            current_batch: iteration,
        }));

        if state.record_item_count() {
            deduper_debug!(
                "No new photos found ({}/{})",
                state.unchanged_iterations(),
                state.max_unchanged()
            );
        }

        let container = scroll_container(page, settings)?;
        let height_before = page.scroll_height(&container)?;
        page.scroll_to(height_before);
        tokio::time::sleep(settings.settle_delay).await;
        let height_after = page.scroll_height(&container)?;
        if state.record_scroll(height_before, height_after) {
            deduper_debug!("Reached end of scroll at height {}", height_after);
        }
    }

    deduper_info!(
        "Discovery complete after {} iterations, found {} unique photos",
        state.iteration(),
        state.len()
    );
    Ok(state.into_items())
}

async fn ensure_listing_view(
    page: &dyn Page,
    settings: &DiscoverySettings,
) -> Result<(), DiscoveryError> {
    let location = page.location();
    let url = Url::parse(&location)
        .ok()
        .filter(|url| url.host_str() == Some(settings.host.as_str()))
        .ok_or_else(|| DiscoveryError::NotOnExpectedPage {
            location: location.clone(),
        })?;

    if is_listing_view(&url, &settings.listing_path) {
        return Ok(());
    }

    match page.query(&settings.listing_link_selector)? {
        Some(link) => {
            deduper_info!("Navigating to Photos tab...");
            page.click(&link)?;
            tokio::time::sleep(settings.navigation_delay).await;
        }
        None => deduper_warn!("Photos tab link not found; scanning the current view"),
    }
    Ok(())
}

/// Root and listing paths count as the listing; albums and detail pages do not.
/// A leading `/u/<n>` account segment is ignored.
pub fn is_listing_view(url: &Url, listing_path: &str) -> bool {
    let path = without_account_prefix(url.path());
    !path.contains("/album/") && (path.is_empty() || path == "/" || path.starts_with(listing_path))
}

fn without_account_prefix(path: &str) -> &str {
    let Some(rest) = path.strip_prefix("/u/") else {
        return path;
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return path;
    }
    let tail = &rest[digits..];
    if tail.is_empty() || tail.starts_with('/') {
        tail
    } else {
        path
    }
}

fn scroll_container(page: &dyn Page, settings: &DiscoverySettings) -> Result<Element, DiscoveryError> {
    match page.query(&settings.scroll_container_selector)? {
        Some(container) => Ok(container),
        None => page.query("body")?.ok_or(DiscoveryError::NoScrollContainer),
    }
}

/// Collects every item currently rendered. Anchors that cannot be turned into
/// an item are skipped; an error on one anchor never drops the others.
pub fn extract_items(
    page: &dyn Page,
    settings: &DiscoverySettings,
) -> Result<Vec<DiscoveredItem>, PageError> {
    let base = Url::parse(&page.location()).ok();
    let anchors = page.query_all(&settings.item_link_selector)?;
    let mut items = Vec::with_capacity(anchors.len());
    for anchor in &anchors {
        match extract_item(page, anchor, base.as_ref()) {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(err) => deduper_warn!(
                "Error extracting photo metadata from node {}: {}",
                anchor.node,
                err
            ),
        }
    }
    Ok(items)
}

fn extract_item(
    page: &dyn Page,
    anchor: &Element,
    base: Option<&Url>,
) -> Result<Option<DiscoveredItem>, PageError> {
    let Some(source_url) = anchor.attr("href").and_then(|href| resolve_href(href, base)) else {
        return Ok(None);
    };
    let Some(id) = item_id_from_url(&source_url) else {
        return Ok(None);
    };
    let Some(image) = page.query_within(anchor, "img")? else {
        return Ok(None);
    };
    let Some(thumbnail) = image_source(&image) else {
        return Ok(None);
    };

    let (width, height) = match image.natural_size {
        Some((w, h)) if w > 0 && h > 0 => (Some(w), Some(h)),
        _ => image.rendered_size(),
    };

    Ok(Some(
        DiscoveredItem::new(id, source_url.as_str(), thumbnail)
            .with_display_name(image.attr("alt"))
            .with_dimensions(ItemDimensions::new(width, height)),
    ))
}

fn image_source(image: &Element) -> Option<&str> {
    ["src", "data-src"]
        .into_iter()
        .filter_map(|name| image.attr(name))
        .map(str::trim)
        .find(|value| !value.is_empty())
}

fn resolve_href(href: &str, base: Option<&Url>) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match Url::parse(href) {
        Ok(url) => Some(url),
        Err(_) => base.and_then(|base| base.join(href).ok()),
    }
}

/// Pulls the identifier following a `photo` or `photos` path segment.
pub fn item_id_from_url(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    while let Some(segment) = segments.next() {
        if segment == "photo" || segment == "photos" {
            return segments
                .next()
                .filter(|id| !id.is_empty())
                .map(str::to_string);
        }
    }
    None
}
