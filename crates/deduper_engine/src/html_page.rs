use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use scraper::{ElementRef, Html, Selector};

use crate::decode::{decode_snapshot, DecodeError};
use crate::page::{Element, MutationObserver, MutationSource, NodeIndex, Page, PageError};

/// A [`Page`] over a static HTML document.
///
/// The document is re-parsed per query, so replacing it is the only mutation.
/// Clicks and scrolls are recorded but have no effect on the markup.
#[derive(Debug)]
pub struct HtmlPage {
    inner: Mutex<Snapshot>,
    mutations: MutationSource,
}

#[derive(Debug)]
struct Snapshot {
    location: String,
    html: String,
    scroll_top: u64,
    clicks: Vec<Element>,
}

impl HtmlPage {
    pub fn new(location: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Snapshot {
                location: location.into(),
                html: html.into(),
                scroll_top: 0,
                clicks: Vec::new(),
            }),
            mutations: MutationSource::new(),
        }
    }

    /// Builds a page from raw saved bytes, honouring the declared charset.
    pub fn from_bytes(
        location: impl Into<String>,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<Self, DecodeError> {
        Ok(Self::new(location, decode_snapshot(bytes, content_type)?))
    }

    /// Swaps the document body and notifies observers.
    pub fn replace_document(&self, html: impl Into<String>) {
        self.lock().html = html.into();
        self.mutations.notify();
    }

    pub fn clicks(&self) -> Vec<Element> {
        self.lock().clicks.clone()
    }

    pub fn scroll_top(&self) -> u64 {
        self.lock().scroll_top
    }

    pub fn observer_count(&self) -> usize {
        self.mutations.observer_count()
    }

    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn parse(&self) -> Html {
        let html = self.lock().html.clone();
        Html::parse_document(&html)
    }
}

fn compile(selector: &str) -> Result<Selector, PageError> {
    Selector::parse(selector).map_err(|err| PageError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{err:?}"),
    })
}

/// Maps every node to its document-order index.
fn node_order(doc: &Html) -> HashMap<ego_tree::NodeId, NodeIndex> {
    doc.root_element()
        .descendants()
        .enumerate()
        .map(|(index, node)| (node.id(), index))
        .collect()
}

fn locate<'a>(doc: &'a Html, element: &Element) -> Result<ElementRef<'a>, PageError> {
    doc.root_element()
        .descendants()
        .nth(element.node)
        .and_then(ElementRef::wrap)
        .filter(|found| found.value().name().eq_ignore_ascii_case(&element.tag))
        .ok_or(PageError::Detached(element.node))
}

fn snapshot_element(element: ElementRef<'_>, node: NodeIndex) -> Element {
    let value = element.value();
    Element {
        node,
        tag: value.name().to_ascii_lowercase(),
        attributes: value
            .attrs()
            .map(|(name, val)| (name.to_string(), val.to_string()))
            .collect(),
        natural_size: None,
    }
}

impl Page for HtmlPage {
    fn location(&self) -> String {
        self.lock().location.clone()
    }

    fn title(&self) -> String {
        let doc = self.parse();
        let Ok(selector) = compile("title") else {
            return String::new();
        };
        doc.select(&selector)
            .next()
            .map(|title| title.text().collect::<String>().trim().to_string())
            .unwrap_or_default()
    }

    fn query_all(&self, selector: &str) -> Result<Vec<Element>, PageError> {
        let selector = compile(selector)?;
        let doc = self.parse();
        let order = node_order(&doc);
        Ok(doc
            .select(&selector)
            .filter_map(|found| order.get(&found.id()).map(|&node| snapshot_element(found, node)))
            .collect())
    }

    fn query_within(&self, scope: &Element, selector: &str) -> Result<Option<Element>, PageError> {
        let selector = compile(selector)?;
        let doc = self.parse();
        let scope = locate(&doc, scope)?;
        let order = node_order(&doc);
        Ok(scope
            .select(&selector)
            .find_map(|found| order.get(&found.id()).map(|&node| snapshot_element(found, node))))
    }

    fn observe_mutations(&self) -> MutationObserver {
        self.mutations.observe()
    }

    fn scroll_height(&self, container: &Element) -> Result<u64, PageError> {
        // No layout engine here; the container's node count stands in for its height.
        let doc = self.parse();
        let container = locate(&doc, container)?;
        Ok(container.descendants().count() as u64)
    }

    fn scroll_to(&self, top: u64) {
        self.lock().scroll_top = top;
    }

    fn click(&self, element: &Element) -> Result<(), PageError> {
        let doc = self.parse();
        locate(&doc, element)?;
        self.lock().clicks.push(element.clone());
        Ok(())
    }
}
