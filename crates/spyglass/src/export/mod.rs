//! Export of rendered diagrams
//!
//! The exporter takes the vector payload of a successful render, makes its
//! background opaque and packages it with a filename derived from the page
//! title. Delivery to the user goes through a [`DownloadSink`].

use serde::{Deserialize, Serialize};

use crate::core::DiagramError;
use crate::engine::RenderResult;

mod download;
mod svg;

pub use download::{deliver, DownloadSink, FileSink};
pub use svg::SvgExporter;

pub const SVG_MIME_TYPE: &str = "image/svg+xml";

/// Characters that are not allowed in exported filenames
const FORBIDDEN_FILENAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportConfig {
    /// Fill of the background rectangle
    pub background: String,
    /// Appended to the sanitized title
    pub suffix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            background: "#ffffff".to_string(),
            suffix: "-diagram.svg".to_string(),
        }
    }
}

/// A file ready to hand to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Produces downloadable artifacts from render results
pub trait ExportService {
    fn export(&self, result: &RenderResult, title: &str) -> Result<ExportArtifact, DiagramError>;
}

/// Filename for an export of the page titled `title`
///
/// ```
/// use spyglass::export::sanitize_filename;
/// assert_eq!(sanitize_filename("a/b: c?", "-diagram.svg"), "ab c-diagram.svg");
/// assert_eq!(sanitize_filename(" <> ", "-diagram.svg"), "diagram-diagram.svg");
/// ```
pub fn sanitize_filename(title: &str, suffix: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !FORBIDDEN_FILENAME_CHARS.contains(c))
        .collect();
    let stem = match cleaned.trim() {
        "" => "diagram",
        stem => stem,
    };
    format!("{}{}", stem, suffix)
}
