//! SVG emission for laid out flowcharts
//!
//! Produces a standalone document with `width`, `height` and `viewBox` set
//! so hosts can read the intrinsic size without measuring.

use std::fmt::{self, Write};

use super::layout::{FlowchartLayout, PositionedEdge, PositionedNode, PositionedSubgraph};
use super::FlowchartDatabase;
use crate::core::{EdgeType, NodeShape, Point};

const NODE_FILL: &str = "#f8fafc";
const NODE_STROKE: &str = "#334155";
const CLUSTER_FILL: &str = "#f1f5f9";
const TEXT_COLOR: &str = "#0f172a";
const FONT_FAMILY: &str = "ui-sans-serif, system-ui, sans-serif";

/// Escape text for use in XML content and attribute values
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Format a coordinate with at most two decimals
pub(crate) fn num(value: f64) -> String {
    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct SvgRenderer;

impl SvgRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render a layout; `id` becomes the root element id and prefixes
    /// marker ids so several diagrams can share one page
    pub fn render(
        &self,
        id: &str,
        db: &FlowchartDatabase,
        layout: &FlowchartLayout,
    ) -> Result<String, fmt::Error> {
        let mut out = String::new();
        let (w, h) = (num(layout.width), num(layout.height));
        write!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" id="{id}" class="spyglass-flowchart" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            id = escape_xml(id),
        )?;
        write_defs(&mut out, id, db)?;

        out.push_str(r#"<g class="clusters">"#);
        for subgraph in &layout.subgraphs {
            write_subgraph(&mut out, subgraph)?;
        }
        out.push_str(r#"</g><g class="edges">"#);
        for edge in &layout.edges {
            write_edge(&mut out, id, edge)?;
        }
        out.push_str(r#"</g><g class="nodes">"#);
        for node in &layout.nodes {
            write_node(&mut out, id, node, db.classes_of(&node.id))?;
        }
        out.push_str("</g></svg>");
        Ok(out)
    }
}

fn write_defs(out: &mut String, id: &str, db: &FlowchartDatabase) -> fmt::Result {
    let id = escape_xml(id);
    write!(
        out,
        r#"<defs><marker id="{id}-arrow" viewBox="0 0 10 10" refX="10" refY="5" markerWidth="8" markerHeight="8" orient="auto-start-reverse"><path d="M0,0 L10,5 L0,10 z" fill="{NODE_STROKE}"/></marker>"#
    )?;
    write!(
        out,
        r#"<marker id="{id}-circle" viewBox="0 0 10 10" refX="10" refY="5" markerWidth="8" markerHeight="8"><circle cx="5" cy="5" r="4" fill="{NODE_FILL}" stroke="{NODE_STROKE}"/></marker>"#
    )?;
    write!(
        out,
        r#"<marker id="{id}-cross" viewBox="0 0 10 10" refX="10" refY="5" markerWidth="8" markerHeight="8"><path d="M1,1 L9,9 M9,1 L1,9" stroke="{NODE_STROKE}" stroke-width="2"/></marker></defs>"#
    )?;

    if !db.class_defs().is_empty() {
        out.push_str("<style>");
        for (name, style) in db.class_defs() {
            let declarations = style.replace(',', ";");
            write!(
                out,
                "#{id} .{} > * {{ {} }}",
                escape_xml(name),
                escape_xml(&declarations)
            )?;
        }
        out.push_str("</style>");
    }
    Ok(())
}

fn write_subgraph(out: &mut String, subgraph: &PositionedSubgraph) -> fmt::Result {
    write!(
        out,
        r#"<g class="cluster" data-id="{}"><rect x="{}" y="{}" width="{}" height="{}" rx="6" fill="{CLUSTER_FILL}" stroke="{NODE_STROKE}" stroke-dasharray="4 2"/>"#,
        escape_xml(&subgraph.id),
        num(subgraph.origin.x),
        num(subgraph.origin.y),
        num(subgraph.width),
        num(subgraph.height),
    )?;
    write!(
        out,
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="{FONT_FAMILY}" font-size="13" font-weight="600" fill="{TEXT_COLOR}">{}</text></g>"#,
        num(subgraph.origin.x + subgraph.width / 2.0),
        num(subgraph.origin.y + 15.0),
        escape_xml(&subgraph.title),
    )
}

fn write_edge(out: &mut String, id: &str, edge: &PositionedEdge) -> fmt::Result {
    let Some((first, rest)) = edge.points.split_first() else {
        return Ok(());
    };

    let mut d = format!("M{},{}", num(first.x), num(first.y));
    for point in rest {
        write!(d, " L{},{}", num(point.x), num(point.y))?;
    }

    let (stroke_width, dash) = match edge.edge_type {
        t if t.is_thick() => ("3", None),
        t if t.is_dotted() => ("1.5", Some("3 3")),
        _ => ("1.5", None),
    };
    let visibility = if edge.edge_type == EdgeType::Invisible {
        r#" visibility="hidden""#
    } else {
        ""
    };
    let marker = match edge.edge_type {
        t if t.has_arrow() => Some("arrow"),
        EdgeType::OpenArrow => Some("circle"),
        EdgeType::CrossArrow => Some("cross"),
        _ => None,
    };

    write!(
        out,
        r#"<path class="edge" data-from="{}" data-to="{}" d="{d}" fill="none" stroke="{NODE_STROKE}" stroke-width="{stroke_width}""#,
        escape_xml(&edge.from),
        escape_xml(&edge.to),
    )?;
    if let Some(dash) = dash {
        write!(out, r#" stroke-dasharray="{dash}""#)?;
    }
    if let Some(marker) = marker {
        write!(out, r#" marker-end="url(#{}-{marker})""#, escape_xml(id))?;
    }
    write!(out, "{visibility}/>")?;

    if let Some(label) = &edge.label {
        let mid = midpoint(&edge.points);
        write!(
            out,
            r##"<text class="edge-label" x="{}" y="{}" text-anchor="middle" dominant-baseline="central" font-family="{FONT_FAMILY}" font-size="12" fill="{TEXT_COLOR}" paint-order="stroke" stroke="#ffffff" stroke-width="4">{}</text>"##,
            num(mid.0),
            num(mid.1),
            escape_xml(label),
        )?;
    }
    Ok(())
}

fn midpoint(points: &[Point]) -> (f64, f64) {
    match points {
        [] => (0.0, 0.0),
        [only] => (only.x, only.y),
        _ => {
            let a = points[(points.len() - 1) / 2];
            let b = points[points.len() / 2];
            ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
        }
    }
}

fn polygon(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{},{}", num(*x), num(*y)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_node(
    out: &mut String,
    id: &str,
    node: &PositionedNode,
    classes: &[String],
) -> fmt::Result {
    let mut class = String::from("node");
    for c in classes {
        class.push(' ');
        class.push_str(c);
    }
    write!(
        out,
        r#"<g class="{}" id="{}-node-{}">"#,
        escape_xml(&class),
        escape_xml(id),
        escape_xml(&node.id),
    )?;

    let (cx, cy) = (node.center.x, node.center.y);
    let (l, t) = (cx - node.width / 2.0, cy - node.height / 2.0);
    let (r, b) = (cx + node.width / 2.0, cy + node.height / 2.0);
    let paint = format!(r#"fill="{NODE_FILL}" stroke="{NODE_STROKE}" stroke-width="1.5""#);
    let rect = |rx: f64| {
        format!(
            r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{}" {paint}/>"#,
            num(l),
            num(t),
            num(node.width),
            num(node.height),
            num(rx),
        )
    };

    match node.shape {
        NodeShape::Rectangle => out.push_str(&rect(0.0)),
        NodeShape::RoundedRect => out.push_str(&rect(10.0)),
        NodeShape::Subroutine => {
            out.push_str(&rect(0.0));
            write!(
                out,
                r#"<path d="M{a},{t} L{a},{b} M{c},{t} L{c},{b}" stroke="{NODE_STROKE}" stroke-width="1.5"/>"#,
                a = num(l + 8.0),
                c = num(r - 8.0),
                t = num(t),
                b = num(b),
            )?;
        }
        NodeShape::Circle => write!(
            out,
            r#"<circle cx="{}" cy="{}" r="{}" {paint}/>"#,
            num(cx),
            num(cy),
            num(node.width / 2.0),
        )?,
        NodeShape::Cylinder => {
            let ry = 6.0;
            write!(
                out,
                r#"<path d="M{l},{t1} A{rx},{ry} 0 0,1 {r},{t1} L{r},{b1} A{rx},{ry} 0 0,1 {l},{b1} Z" {paint}/><path d="M{l},{t1} A{rx},{ry} 0 0,0 {r},{t1}" fill="none" stroke="{NODE_STROKE}" stroke-width="1.5"/>"#,
                l = num(l),
                r = num(r),
                t1 = num(t + ry),
                b1 = num(b - ry),
                rx = num(node.width / 2.0),
                ry = num(ry),
            )?;
        }
        shape => {
            let k = node.height / 2.0;
            let points = match shape {
                NodeShape::Diamond => vec![(cx, t), (r, cy), (cx, b), (l, cy)],
                NodeShape::Hexagon => vec![
                    (l + k, t),
                    (r - k, t),
                    (r, cy),
                    (r - k, b),
                    (l + k, b),
                    (l, cy),
                ],
                NodeShape::Asymmetric => vec![(l, t), (r, t), (r, b), (l, b), (l + k, cy)],
                NodeShape::Parallelogram => vec![(l + k, t), (r, t), (r - k, b), (l, b)],
                _ => vec![(l + k, t), (r - k, t), (r, b), (l, b)],
            };
            write!(out, r#"<polygon points="{}" {paint}/>"#, polygon(&points))?;
        }
    }

    write!(
        out,
        r#"<text x="{}" y="{}" text-anchor="middle" dominant-baseline="central" font-family="{FONT_FAMILY}" font-size="14" fill="{TEXT_COLOR}">{}</text></g>"#,
        num(cx),
        num(cy),
        escape_xml(&node.label),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::LayeredLayout;
    use crate::syntax::parse_document;

    fn render(text: &str) -> String {
        let db = FlowchartDatabase::from_document(&parse_document(text).unwrap());
        let layout = LayeredLayout::new().layout(&db);
        SvgRenderer::new().render("test-diagram", &db, &layout).unwrap()
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml(r#"a<b & "c""#), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn test_num_formatting() {
        assert_eq!(num(12.0), "12");
        assert_eq!(num(12.5), "12.5");
        assert_eq!(num(1.0 / 3.0), "0.33");
        assert_eq!(num(-0.001), "0");
    }

    #[test]
    fn test_output_is_well_formed_svg() {
        let svg = render("graph TD\nA[\"src/index.js\"]-->|imports| B{Check & go}\nB-.->C((Done))");
        let doc = roxmltree::Document::parse(&svg).unwrap();
        let root = doc.root_element();
        assert_eq!(root.tag_name().name(), "svg");
        assert_eq!(root.attribute("id"), Some("test-diagram"));
        assert!(root.attribute("width").is_some());
        assert!(root.attribute("viewBox").is_some());
        assert!(svg.contains("src/index.js"));
        assert!(svg.contains("Check &amp; go"));
    }

    #[test]
    fn test_every_shape_renders() {
        let svg = render(
            "graph LR\nA[a]-->B(b)-->C((c))-->D{d}-->E{{e}}\nE-->F[[f]]-->G[(g)]-->H>h]-->I[/i/]-->J[/j\\]",
        );
        assert!(roxmltree::Document::parse(&svg).is_ok());
        assert_eq!(svg.matches(r#"<g class="node""#).count(), 10);
    }

    #[test]
    fn test_markers_follow_edge_type() {
        let svg = render("graph TD\nA-->B\nB---C\nC--oD\nD--xE");
        assert!(svg.contains("url(#test-diagram-arrow)"));
        assert!(svg.contains("url(#test-diagram-circle)"));
        assert!(svg.contains("url(#test-diagram-cross)"));
        assert_eq!(svg.matches("marker-end").count(), 3);
    }

    #[test]
    fn test_class_defs_become_styles() {
        let svg = render("graph TD\nA:::hot-->B\nclassDef hot fill:#f96,stroke:#333");
        assert!(svg.contains(r#"class="node hot""#));
        assert!(svg.contains("fill:#f96;stroke:#333"));
    }

    #[test]
    fn test_subgraph_cluster_drawn() {
        let svg = render("graph TD\nsubgraph Backend\nA-->B\nend");
        assert!(svg.contains(r#"class="cluster""#));
        assert!(svg.contains(">Backend</text>"));
    }
}
