use crate::core::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tunables of the extensions view. Every field falls back to its default
/// when missing from the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GalleryConfig {
    /// Quiet period before a typed query is sent to the gallery.
    pub search_delay_ms: u64,
    pub row_height: f32,
    /// Extra rows rendered below the viewport.
    pub overscan: usize,
    pub page_size: usize,
    /// Height of the search header above the list.
    pub header_height: f32,
    /// Settings namespace the proxy resolver reads from.
    pub proxy_settings_key: String,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            search_delay_ms: 500,
            row_height: 62.0,
            overscan: 2,
            page_size: 50,
            header_height: 41.0,
            proxy_settings_key: "http".to_string(),
        }
    }
}

impl GalleryConfig {
    /// `~/.nohrs/extensions.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".nohrs").join("extensions.json"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)?;
        let config: GalleryConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn search_delay(&self) -> Duration {
        Duration::from_millis(self.search_delay_ms)
    }

    fn validate(&self) -> Result<()> {
        if !(self.row_height > 0.0) {
            return Err(Error::Config(format!(
                "rowHeight must be positive, got {}",
                self.row_height
            )));
        }
        if self.page_size == 0 {
            return Err(Error::Config("pageSize must be at least 1".to_string()));
        }
        if self.header_height < 0.0 {
            return Err(Error::Config("headerHeight must not be negative".to_string()));
        }
        Ok(())
    }
}
