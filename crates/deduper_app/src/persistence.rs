use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use deduper_core::DiscoveredItem;
use deduper_engine::write_atomic;
use deduper_logging::deduper_info;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SNAPSHOT_PATH: &str = "discovered.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DiscoverySnapshot {
    source_url: String,
    photos: Vec<DiscoveredItem>,
}

/// Writes the discovered set so a later invocation can upload it.
pub(crate) fn save_discovered(path: &Path, source_url: &str, photos: &[DiscoveredItem]) -> Result<()> {
    let snapshot = DiscoverySnapshot {
        source_url: source_url.to_string(),
        photos: photos.to_vec(),
    };
    let content = ron::ser::to_string_pretty(&snapshot, ron::ser::PrettyConfig::new())
        .context("serializing discovered photos")?;
    write_atomic(path, &content).with_context(|| format!("writing {}", path.display()))?;
    deduper_info!("Saved {} photos to {:?}", photos.len(), path);
    Ok(())
}

pub(crate) fn load_discovered(path: &Path) -> Result<Vec<DiscoveredItem>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let snapshot: DiscoverySnapshot =
        ron::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    deduper_info!(
        "Loaded {} photos discovered on {}",
        snapshot.photos.len(),
        snapshot.source_url
    );
    Ok(snapshot.photos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deduper_core::ItemDimensions;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn snapshot_survives_a_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_SNAPSHOT_PATH);
        let photos = vec![
            DiscoveredItem::new("a", "https://photos.google.com/photo/a", "https://lh3/a")
                .with_display_name(Some("Beach"))
                .with_dimensions(ItemDimensions::new(Some(640), None)),
            DiscoveredItem::new("b", "https://photos.google.com/photo/b", "https://lh3/b"),
        ];

        save_discovered(&path, "https://photos.google.com/", &photos).unwrap();
        assert_eq!(load_discovered(&path).unwrap(), photos);
    }

    #[test]
    fn missing_snapshot_names_the_file() {
        let dir = TempDir::new().unwrap();
        let err = load_discovered(&dir.path().join("nope.ron")).unwrap_err();
        assert!(err.to_string().contains("nope.ron"));
    }
}
