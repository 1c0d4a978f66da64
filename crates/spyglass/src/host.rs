//! Thumbnail host
//!
//! Owns the sources, the render engine and, while the modal is open, a
//! viewport. The viewport is created on every open and dropped on close, so
//! nothing carries over between opens. The first successful render after an
//! open fits the content once; later renders keep the user's zoom.

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use serde::Serialize;
use tracing::{debug, info};

use crate::core::{DiagramError, DiagramSource, Size, ViewerConfig};
use crate::engine::{RenderEngine, RenderResult};
use crate::export::{ExportArtifact, ExportService, SvgExporter};
use crate::service::RenderService;
use crate::viewport::{ViewportConfig, ViewportController};

pub const DEFAULT_TRIGGER_LABEL: &str = "View diagram";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Tab {
    Diagram,
    TreeText,
}

pub struct ThumbnailHost {
    engine: RenderEngine,
    exporter: Box<dyn ExportService>,
    viewport_config: ViewportConfig,
    trigger_label: String,
    graph: Option<DiagramSource>,
    tree: Option<DiagramSource>,
    tab: Tab,
    viewport: Option<ViewportController>,
    fitted: bool,
}

impl ThumbnailHost {
    pub fn new(service: Rc<dyn RenderService>, config: &ViewerConfig) -> Self {
        Self {
            engine: RenderEngine::new(service),
            exporter: Box::new(SvgExporter::new(config.export.clone())),
            viewport_config: config.viewport,
            trigger_label: DEFAULT_TRIGGER_LABEL.to_string(),
            graph: None,
            tree: None,
            tab: Tab::Diagram,
            viewport: None,
            fitted: false,
        }
    }

    pub fn with_engine(mut self, engine: RenderEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_exporter(mut self, exporter: impl ExportService + 'static) -> Self {
        self.exporter = Box::new(exporter);
        self
    }

    pub fn with_trigger_label(mut self, label: impl Into<String>) -> Self {
        self.trigger_label = label.into();
        self
    }

    pub fn trigger_label(&self) -> &str {
        &self.trigger_label
    }

    pub fn engine(&self) -> &RenderEngine {
        &self.engine
    }

    pub fn result(&self) -> RenderResult {
        self.engine.result()
    }

    /// Replace both sources and render whichever is present, graph first
    pub fn load(
        &mut self,
        graph: Option<&str>,
        tree: Option<&str>,
    ) -> Option<LocalBoxFuture<'static, RenderResult>> {
        self.graph = graph.map(DiagramSource::graph);
        self.tree = tree.map(DiagramSource::tree);
        self.tab = self.available_tabs().first().copied().unwrap_or(Tab::Diagram);
        debug!(tab = ?self.tab, "Loaded sources");

        let source = self.graph.clone().or_else(|| self.tree.clone())?;
        Some(self.engine.render(source))
    }

    pub fn retry(&self) -> LocalBoxFuture<'static, RenderResult> {
        self.engine.retry()
    }

    pub fn is_open(&self) -> bool {
        self.viewport.is_some()
    }

    pub fn open(&mut self) {
        info!("Opening diagram viewer");
        self.viewport = Some(ViewportController::new(self.viewport_config));
        self.fitted = false;
    }

    pub fn close(&mut self) {
        info!("Closing diagram viewer");
        self.viewport = None;
        self.fitted = false;
    }

    pub fn viewport(&self) -> Option<&ViewportController> {
        self.viewport.as_ref()
    }

    pub fn viewport_mut(&mut self) -> Option<&mut ViewportController> {
        self.viewport.as_mut()
    }

    /// Fit the rendered diagram into `container`, once per open
    ///
    /// Returns whether a fit happened. `measured` is the host's bounding box
    /// for payloads that carry no size of their own.
    pub fn on_render_ready(&mut self, container: Size, measured: Option<Size>) -> bool {
        if self.fitted {
            return false;
        }
        let result = self.engine.result();
        let (Some(viewport), Some(svg)) = (self.viewport.as_mut(), result.vector_payload()) else {
            return false;
        };
        viewport.fit_svg(svg, container, measured);
        self.fitted = true;
        debug!(zoom = viewport.zoom(), "Initial fit applied");
        true
    }

    pub fn available_tabs(&self) -> Vec<Tab> {
        let present = |s: &Option<DiagramSource>| s.as_ref().is_some_and(|s| !s.is_blank());
        let mut tabs = Vec::with_capacity(2);
        if present(&self.graph) {
            tabs.push(Tab::Diagram);
        }
        if present(&self.tree) {
            tabs.push(Tab::TreeText);
        }
        tabs
    }

    /// Tabs are only offered when there is more than one view
    pub fn shows_tabs(&self) -> bool {
        self.available_tabs().len() > 1
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    /// Switch views; refused for a tab with no source
    pub fn select_tab(&mut self, tab: Tab) -> bool {
        if !self.available_tabs().contains(&tab) {
            return false;
        }
        self.tab = tab;
        true
    }

    pub fn tree_text(&self) -> Option<&str> {
        self.tree.as_ref().map(|s| s.raw_text.as_str())
    }

    pub fn export(&self, title: &str) -> Result<ExportArtifact, DiagramError> {
        self.exporter.export(&self.engine.result(), title)
    }
}
