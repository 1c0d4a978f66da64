//! Built-in flowchart rendering service

use futures::future::{self, FutureExt, LocalBoxFuture};
use tracing::{debug, info, span, Level};

use super::{render_tree, FlowchartDatabase, LayeredLayout, RenderService, SvgRenderer};
use crate::core::{DiagramError, DiagramKind};
use crate::syntax::parse_document;

/// Grammar, layered layout and SVG emission in one synchronous pass
#[derive(Debug, Default)]
pub struct FlowchartService {
    layout: LayeredLayout,
    renderer: SvgRenderer,
}

impl FlowchartService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(layout: LayeredLayout) -> Self {
        Self {
            layout,
            renderer: SvgRenderer::new(),
        }
    }

    /// Synchronous grammar check
    pub fn check(&self, text: &str) -> Result<(), DiagramError> {
        parse_document(text).map(|_| ())
    }

    /// Synchronous compile
    pub fn compile_now(
        &self,
        id: &str,
        kind: DiagramKind,
        text: &str,
    ) -> Result<String, DiagramError> {
        let _span = span!(Level::INFO, "compile", id, %kind, input_len = text.len()).entered();

        let svg = match kind {
            DiagramKind::Tree => render_tree(id, text),
            DiagramKind::Graph => {
                let document = parse_document(text)?;
                let db = FlowchartDatabase::from_document(&document);
                let layout = self.layout.layout(&db);
                debug!(width = layout.width, height = layout.height, "Laid out flowchart");
                self.renderer.render(id, &db, &layout)
            }
        }
        .map_err(|e| DiagramError::render_failure(format!("SVG emission failed: {}", e)))?;

        info!(output_len = svg.len(), "Compiled diagram");
        Ok(svg)
    }
}

impl RenderService for FlowchartService {
    fn parse<'a>(&'a self, text: &'a str) -> LocalBoxFuture<'a, Result<(), DiagramError>> {
        future::ready(self.check(text)).boxed_local()
    }

    fn compile<'a>(
        &'a self,
        id: &'a str,
        kind: DiagramKind,
        text: &'a str,
    ) -> LocalBoxFuture<'a, Result<String, DiagramError>> {
        future::ready(self.compile_now(id, kind, text)).boxed_local()
    }

    fn name(&self) -> &'static str {
        "flowchart"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_parse_accepts_valid_flowchart() {
        let service = FlowchartService::new();
        assert!(block_on(service.parse("graph TD\nA-->B")).is_ok());
    }

    #[test]
    fn test_parse_rejects_invalid_flowchart() {
        let service = FlowchartService::new();
        let err = block_on(service.parse("graph TD\nA[src/index.js]-->B")).unwrap_err();
        assert!(matches!(err, DiagramError::ParseError { line: 2, .. }));
    }

    #[test]
    fn test_compile_graph() {
        let service = FlowchartService::new();
        let svg = block_on(service.compile("d1", DiagramKind::Graph, "graph LR\nA-->B")).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"id="d1""#));
    }

    #[test]
    fn test_compile_tree_skips_grammar() {
        let service = FlowchartService::new();
        let svg = block_on(service.compile("d2", DiagramKind::Tree, "src/\n  a - -> b")).unwrap();
        assert!(svg.contains("spyglass-tree"));
    }

    #[test]
    fn test_compile_invalid_graph_fails() {
        let service = FlowchartService::new();
        assert!(service
            .compile_now("d3", DiagramKind::Graph, "graph TD\nA - -> B")
            .is_err());
    }
}
