//! Spyglass - Repair, render, view and export generated diagrams
//!
//! A library for turning almost-right flowchart text into a rendered SVG,
//! and for the viewer logic around it: zoom, pan and fit, and export with an
//! opaque background.
//!
//! # Quick Start
//!
//! ```rust
//! use spyglass::render;
//!
//! // Missing header and an unquoted path label are repaired before parsing
//! let svg = render("A[src/index.js]-->B").unwrap();
//! assert!(svg.contains("src/index.js"));
//! ```
//!
//! # Advanced Usage
//!
//! The pieces can be driven individually:
//!
//! ```rust
//! use std::rc::Rc;
//! use futures::executor::block_on;
//! use spyglass::prelude::*;
//!
//! let service = Rc::new(FlowchartService::new());
//! let engine = RenderEngine::new(service);
//!
//! let result = block_on(engine.render(DiagramSource::graph("A-->B")));
//! assert_eq!(result.status(), RenderStatus::Success);
//! assert_eq!(result.validated_text(), Some("graph TD\nA-->B"));
//!
//! let mut viewport = ViewportController::default();
//! viewport.fit_to_content(Size::new(400.0, 300.0), Size::new(800.0, 400.0));
//!
//! let artifact = SvgExporter::default().export(&result, "My diagram").unwrap();
//! assert_eq!(artifact.filename, "My diagram-diagram.svg");
//! ```

use std::rc::Rc;

use futures::executor::block_on;

pub mod core;
pub mod engine;
pub mod export;
pub mod host;
pub mod repair;
pub mod service;
pub mod syntax;
pub mod viewport;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        DiagramError, DiagramKind, DiagramSource, Direction, ErrorKind, Point, Size, ViewerConfig,
    };
    pub use crate::engine::{FrameClock, ImmediateFrame, RenderEngine, RenderResult, RenderStatus};
    pub use crate::export::{deliver, DownloadSink, ExportArtifact, ExportService, SvgExporter};
    pub use crate::host::{Tab, ThumbnailHost};
    pub use crate::repair::{Validation, Validator};
    pub use crate::service::{FlowchartService, RenderService};
    pub use crate::viewport::{ViewportConfig, ViewportController};
}

/// Repair and check flowchart text
///
/// # Example
/// ```rust
/// let validation = spyglass::validate("A - -> B");
/// assert!(validation.is_valid);
/// assert_eq!(validation.code, "graph TD\nA --> B");
/// assert_eq!(validation.applied_fix, Some("arrow-spacing"));
/// ```
pub fn validate(input: &str) -> repair::Validation {
    let validator = repair::Validator::new(Rc::new(service::FlowchartService::new()));
    block_on(validator.validate_text(input))
}

/// Apply only the always-safe normalization fixes
///
/// # Example
/// ```rust
/// assert_eq!(spyglass::normalize("A-->B"), "graph TD\nA-->B");
/// ```
pub fn normalize(input: &str) -> String {
    repair::pre_pass(input)
}

/// Repair and render flowchart text to SVG
pub fn render(input: &str) -> anyhow::Result<String> {
    render_source(DiagramSource::graph(input))
}

/// Repair and render a source of either kind to SVG
pub fn render_source(source: DiagramSource) -> anyhow::Result<String> {
    let engine = engine::RenderEngine::new(Rc::new(service::FlowchartService::new()));
    match block_on(engine.render(source)) {
        engine::RenderResult::Success { vector_payload, .. } => Ok(vector_payload),
        engine::RenderResult::Error {
            error_detail, kind, ..
        } => Err(anyhow::anyhow!("{} ({})", error_detail, kind)),
        other => Err(anyhow::anyhow!("render did not settle: {:?}", other.status())),
    }
}

/// Render flowchart text and package it for download
pub fn export(
    input: &str,
    title: &str,
    config: &ViewerConfig,
) -> anyhow::Result<export::ExportArtifact> {
    use crate::export::ExportService as _;

    let engine = engine::RenderEngine::new(Rc::new(service::FlowchartService::new()));
    let result = block_on(engine.render(DiagramSource::graph(input)));
    if let Some(detail) = result.error_detail() {
        anyhow::bail!("{}", detail);
    }
    let exporter = export::SvgExporter::new(config.export.clone());
    Ok(exporter.export(&result, title)?)
}
