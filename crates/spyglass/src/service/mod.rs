//! Rendering service seam
//!
//! The engine and the validator only talk to a [`RenderService`]: something
//! that can check text against its grammar and compile it into SVG. Layout
//! quality is the service's business. [`FlowchartService`] is the built-in
//! implementation: a strict grammar, a layered layout and plain SVG output.

use futures::future::LocalBoxFuture;

use crate::core::{DiagramError, DiagramKind};

mod database;
mod flowchart;
mod layout;
mod svg;
mod tree;

pub use database::{FlowchartDatabase, Subgraph};
pub use flowchart::FlowchartService;
pub use layout::{
    FlowchartLayout, LayeredLayout, LayoutConfig, PositionedEdge, PositionedNode,
    PositionedSubgraph,
};
pub use svg::{escape_xml, SvgRenderer};
pub use tree::render_tree;

/// An opaque diagram rendering service
///
/// Both operations may suspend. Implementations must not hold state that
/// makes the result of one call depend on another.
pub trait RenderService {
    /// Check `text` against the service's grammar
    fn parse<'a>(&'a self, text: &'a str) -> LocalBoxFuture<'a, Result<(), DiagramError>>;

    /// Compile `text` into a standalone SVG document whose root carries `id`
    fn compile<'a>(
        &'a self,
        id: &'a str,
        kind: DiagramKind,
        text: &'a str,
    ) -> LocalBoxFuture<'a, Result<String, DiagramError>>;

    /// Service name for logs
    fn name(&self) -> &'static str {
        "unnamed"
    }
}
