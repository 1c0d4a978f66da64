use tracing::{debug, info};

use super::{sanitize_filename, ExportArtifact, ExportConfig, ExportService, SVG_MIME_TYPE};
use crate::core::DiagramError;
use crate::engine::RenderResult;
use crate::service::escape_xml;

/// Exports the SVG payload with an opaque background
#[derive(Debug, Clone, Default)]
pub struct SvgExporter {
    config: ExportConfig,
}

impl SvgExporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Insert a background rectangle as the first child of the root element
    pub fn with_background(&self, svg: &str) -> Result<String, DiagramError> {
        let doc = roxmltree::Document::parse(svg)
            .map_err(|e| DiagramError::malformed_vector(e.to_string()))?;
        let root = doc.root_element();
        let tag = root.tag_name().name();
        if tag != "svg" {
            return Err(DiagramError::malformed_vector(format!(
                "root element is <{}>, expected <svg>",
                tag
            )));
        }

        let rect = background_rect(root.attribute("viewBox"), &self.config.background);
        let start = root.range().start;
        let (tag_end, self_closing) = start_tag_end(svg, start).ok_or_else(|| {
            DiagramError::malformed_vector("unterminated root start tag")
        })?;

        let mut out = String::with_capacity(svg.len() + rect.len() + 8);
        if self_closing {
            // `<svg .../>` becomes `<svg ...>{rect}</svg>`
            let qualified = qualified_name(&svg[start + 1..]);
            out.push_str(svg[..tag_end - 1].trim_end_matches('/'));
            out.push('>');
            out.push_str(&rect);
            out.push_str("</");
            out.push_str(qualified);
            out.push('>');
        } else {
            out.push_str(&svg[..tag_end]);
            out.push_str(&rect);
        }
        out.push_str(&svg[tag_end..]);
        Ok(out)
    }
}

impl ExportService for SvgExporter {
    fn export(&self, result: &RenderResult, title: &str) -> Result<ExportArtifact, DiagramError> {
        let payload = result.vector_payload().ok_or(DiagramError::MissingContent)?;
        let svg = self.with_background(payload)?;
        let filename = sanitize_filename(title, &self.config.suffix);
        info!(%filename, bytes = svg.len(), "Exported diagram");
        Ok(ExportArtifact {
            filename,
            mime_type: SVG_MIME_TYPE,
            bytes: svg.into_bytes(),
        })
    }
}

fn background_rect(view_box: Option<&str>, fill: &str) -> String {
    let fill = escape_xml(fill);
    let bounds = view_box.and_then(|vb| {
        let values: Vec<&str> = vb
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .collect();
        let valid = values.len() == 4 && values.iter().all(|v| v.parse::<f64>().is_ok());
        valid.then_some(values)
    });
    match bounds {
        Some(v) => {
            debug!(view_box = ?v, "Background covers viewBox");
            format!(
                r#"<rect class="spyglass-background" x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
                v[0], v[1], v[2], v[3], fill
            )
        }
        None => format!(
            r#"<rect class="spyglass-background" x="0" y="0" width="100%" height="100%" fill="{}"/>"#,
            fill
        ),
    }
}

/// Byte offset just past the `>` of the start tag at `start`
fn start_tag_end(svg: &str, start: usize) -> Option<(usize, bool)> {
    let mut quote: Option<char> = None;
    let mut prev = '\0';
    for (i, c) in svg[start..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some((start + i + 1, prev == '/')),
            _ => {}
        }
        prev = c;
    }
    None
}

fn qualified_name(tag: &str) -> &str {
    let end = tag
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(tag.len());
    &tag[..end]
}
