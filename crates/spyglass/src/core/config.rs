//! Viewer configuration
//!
//! A single serde document grouping the tunables of the viewport and the
//! exporter. Every field has a default, so an empty JSON object is a valid
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use super::DiagramError;
use crate::export::ExportConfig;
use crate::viewport::ViewportConfig;

/// Top-level viewer configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    pub viewport: ViewportConfig,
    pub export: ExportConfig,
}

impl ViewerConfig {
    /// Parse a JSON configuration document
    pub fn from_json(text: &str) -> Result<Self, DiagramError> {
        let config: ViewerConfig =
            serde_json::from_str(text).map_err(|e| DiagramError::config(e.to_string()))?;
        config.viewport.check()?;
        debug!(?config, "Loaded viewer configuration");
        Ok(config)
    }

    /// Read and parse a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, DiagramError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
