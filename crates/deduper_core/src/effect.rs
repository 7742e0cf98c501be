use crate::DiscoveredItem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Probe the backend session endpoint.
    CheckConnection,
    /// Ask the content script in the active tab to discover photos.
    StartDiscovery,
    /// Upload the discovered set in batches.
    UploadPhotos { photos: Vec<DiscoveredItem> },
    /// Ask the backend to start duplicate analysis.
    StartAnalysis,
    /// Open the main application UI.
    OpenApp,
    /// Show a blocking notice to the user.
    Alert(String),
}
