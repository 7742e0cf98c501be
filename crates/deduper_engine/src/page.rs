//! Read/observe/act abstraction over a host document.
//!
//! The discovery loop, the element waiter and the deletion sequence only talk
//! to a [`Page`], so they run the same way against a live document bridge, a
//! parsed HTML snapshot ([`crate::HtmlPage`]) or a scripted fake in tests.

use std::collections::BTreeMap;

use thiserror::Error;
use tokio::sync::watch;

/// Document-order position of an element within its page.
pub type NodeIndex = usize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("invalid selector `{selector}`: {message}")]
    InvalidSelector { selector: String, message: String },
    #[error("element #{0} is no longer attached to the document")]
    Detached(NodeIndex),
}

/// Snapshot of one element at query time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub node: NodeIndex,
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// Intrinsic pixel size, when the page knows it (decoded images).
    pub natural_size: Option<(u32, u32)>,
}

impl Element {
    pub fn new(node: NodeIndex, tag: impl Into<String>) -> Self {
        Self {
            node,
            tag: tag.into(),
            attributes: BTreeMap::new(),
            natural_size: None,
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_natural_size(mut self, width: u32, height: u32) -> Self {
        self.natural_size = Some((width, height));
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Size from the `width`/`height` attributes.
    pub fn rendered_size(&self) -> (Option<u32>, Option<u32>) {
        let parse = |name: &str| self.attr(name).and_then(|v| v.trim().parse::<u32>().ok());
        (parse("width"), parse("height"))
    }
}

pub trait Page: Send + Sync {
    /// Current document URL.
    fn location(&self) -> String;

    fn title(&self) -> String;

    fn query_all(&self, selector: &str) -> Result<Vec<Element>, PageError>;

    fn query(&self, selector: &str) -> Result<Option<Element>, PageError> {
        Ok(self.query_all(selector)?.into_iter().next())
    }

    /// First descendant of `scope` matching `selector`.
    fn query_within(&self, scope: &Element, selector: &str) -> Result<Option<Element>, PageError>;

    /// Subscribes to subtree mutations of the document body.
    /// Dropping the returned observer disconnects it.
    fn observe_mutations(&self) -> MutationObserver;

    /// Total content height of a scrollable container.
    fn scroll_height(&self, container: &Element) -> Result<u64, PageError>;

    fn scroll_to(&self, top: u64);

    fn click(&self, element: &Element) -> Result<(), PageError>;
}

/// Publisher side of mutation notifications, embedded by `Page` implementations.
#[derive(Debug)]
pub struct MutationSource {
    tx: watch::Sender<u64>,
}

impl MutationSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    /// Signals one batch of mutations to every connected observer.
    pub fn notify(&self) {
        self.tx.send_modify(|generation| *generation = generation.wrapping_add(1));
    }

    pub fn observe(&self) -> MutationObserver {
        MutationObserver {
            rx: self.tx.subscribe(),
        }
    }

    /// Observers currently connected.
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for MutationSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct MutationObserver {
    rx: watch::Receiver<u64>,
}

impl MutationObserver {
    /// Waits for the next mutation batch. Returns false once the page is gone.
    pub async fn next_batch(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
