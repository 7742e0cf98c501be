use crate::view_model::{AppViewModel, ProgressLine, Tone};
use crate::DiscoveredItem;

/// Host the active tab must be on before discovery can start.
pub const PHOTOS_HOST: &str = "photos.google.com";

/// Result of probing the backend session endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    NotLoggedIn,
    Unreachable,
}

impl ConnectionStatus {
    pub fn describe(self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "Connected to backend",
            ConnectionStatus::NotLoggedIn => "Not logged in. Please log in to the web app.",
            ConnectionStatus::Unreachable => "Backend not reachable. Please start the app.",
        }
    }
}

/// Control-surface state. Mutated only through [`crate::update`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    connection: Option<ConnectionStatus>,
    discovered: Vec<DiscoveredItem>,
    discovering: bool,
    sending: bool,
    analyzing: bool,
    photos_sent: bool,
    task_id: Option<String>,
    progress: Option<ProgressLine>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            connection: self.connection,
            progress: self.progress.clone(),
            photos_count: self.discovered.len(),
            discover_enabled: !self.discovering,
            send_enabled: !self.discovered.is_empty() && !self.sending && !self.photos_sent,
            analyze_enabled: self.photos_sent && !self.analyzing && self.task_id.is_none(),
            task_id: self.task_id.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn discovered(&self) -> &[DiscoveredItem] {
        &self.discovered
    }

    pub(crate) fn is_discovering(&self) -> bool {
        self.discovering
    }

    pub(crate) fn is_sending(&self) -> bool {
        self.sending
    }

    pub(crate) fn is_analyzing(&self) -> bool {
        self.analyzing
    }

    pub(crate) fn photos_sent(&self) -> bool {
        self.photos_sent
    }

    pub(crate) fn set_connection(&mut self, status: ConnectionStatus) {
        self.connection = Some(status);
        self.dirty = true;
    }

    pub(crate) fn set_progress(&mut self, tone: Tone, text: impl Into<String>) {
        self.progress = Some(ProgressLine {
            text: text.into(),
            tone,
        });
        self.dirty = true;
    }

    pub(crate) fn set_discovering(&mut self, busy: bool) {
        self.discovering = busy;
        self.dirty = true;
    }

    pub(crate) fn set_sending(&mut self, busy: bool) {
        self.sending = busy;
        self.dirty = true;
    }

    pub(crate) fn set_analyzing(&mut self, busy: bool) {
        self.analyzing = busy;
        self.dirty = true;
    }

    /// Replaces the discovered set; a new set has not been uploaded yet.
    pub(crate) fn set_discovered(&mut self, items: Vec<DiscoveredItem>) {
        self.discovered = items;
        self.photos_sent = false;
        self.task_id = None;
        self.dirty = true;
    }

    pub(crate) fn mark_sent(&mut self) {
        self.photos_sent = true;
        self.dirty = true;
    }

    pub(crate) fn set_task_id(&mut self, task_id: String) {
        self.task_id = Some(task_id);
        self.dirty = true;
    }
}
