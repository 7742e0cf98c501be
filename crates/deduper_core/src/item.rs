use serde::{Deserialize, Serialize};

/// Mime type reported when the page gives no better hint.
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// One media item found on the host page.
///
/// Field names on the wire follow the media-item shape the backend already
/// stores (`productUrl`, `baseUrl`, `filename`, `mediaMetadata`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredItem {
    pub id: String,
    #[serde(rename = "productUrl")]
    pub source_url: String,
    #[serde(rename = "baseUrl")]
    pub thumbnail_url: String,
    #[serde(rename = "filename")]
    pub display_name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    #[serde(rename = "mediaMetadata", default)]
    pub dimensions: ItemDimensions,
}

impl DiscoveredItem {
    /// Builds an item with the fallback name and mime type filled in.
    pub fn new(
        id: impl Into<String>,
        source_url: impl Into<String>,
        thumbnail_url: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            display_name: fallback_display_name(&id),
            id,
            source_url: source_url.into(),
            thumbnail_url: thumbnail_url.into(),
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            dimensions: ItemDimensions::default(),
        }
    }

    pub fn with_display_name(mut self, name: Option<&str>) -> Self {
        if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
            self.display_name = name.to_string();
        }
        self
    }

    pub fn with_dimensions(mut self, dimensions: ItemDimensions) -> Self {
        self.dimensions = dimensions;
        self
    }
}

/// Synthetic label used when the page exposes no alt text.
pub fn fallback_display_name(id: &str) -> String {
    format!("photo_{id}")
}

/// Pixel dimensions as the page reports them; strings to match the backend schema.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemDimensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
}

impl ItemDimensions {
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            width: width.map(|w| w.to_string()),
            height: height.map(|h| h.to_string()),
        }
    }
}
