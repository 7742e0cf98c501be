use crate::ConnectionStatus;

/// Visual weight of the progress line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLine {
    pub text: String,
    pub tone: Tone,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub connection: Option<ConnectionStatus>,
    pub progress: Option<ProgressLine>,
    pub photos_count: usize,
    pub discover_enabled: bool,
    pub send_enabled: bool,
    pub analyze_enabled: bool,
    pub task_id: Option<String>,
    pub dirty: bool,
}
