//! Monospace rendering of directory tree dumps

use std::fmt::{self, Write};
use unicode_width::UnicodeWidthStr;

use super::svg::{escape_xml, num};

const CHAR_WIDTH: f64 = 8.4;
const LINE_HEIGHT: f64 = 18.0;
const PADDING: f64 = 16.0;

/// Render each input line as a `<tspan>` of one monospace `<text>` block
pub fn render_tree(id: &str, text: &str) -> Result<String, fmt::Error> {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let columns = lines
        .iter()
        .map(|line| UnicodeWidthStr::width(*line))
        .max()
        .unwrap_or(0);

    let width = columns as f64 * CHAR_WIDTH + 2.0 * PADDING;
    let height = lines.len() as f64 * LINE_HEIGHT + 2.0 * PADDING;
    let (w, h) = (num(width), num(height));

    let mut out = String::new();
    write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" id="{}" class="spyglass-tree" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        escape_xml(id),
    )?;
    write!(
        out,
        r#"<text x="{pad}" y="{pad}" font-family="ui-monospace, SFMono-Regular, Menlo, monospace" font-size="14" fill="currentColor" xml:space="preserve">"#,
        pad = num(PADDING),
    )?;
    for line in &lines {
        write!(
            out,
            r#"<tspan x="{}" dy="{}">{}</tspan>"#,
            num(PADDING),
            num(LINE_HEIGHT),
            escape_xml(line),
        )?;
    }
    out.push_str("</text></svg>");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_tspan_per_line() {
        let svg = render_tree("t", "src/\n├── lib.rs\n└── main.rs\n").unwrap();
        let doc = roxmltree::Document::parse(&svg).unwrap();
        let tspans = doc
            .descendants()
            .filter(|n| n.has_tag_name("tspan"))
            .count();
        assert_eq!(tspans, 3);
    }

    #[test]
    fn test_size_tracks_longest_line() {
        let narrow = render_tree("t", "a").unwrap();
        let wide = render_tree("t", "a\nabcdefghij").unwrap();
        let width = |svg: &str| -> f64 {
            let doc = roxmltree::Document::parse(svg).unwrap();
            doc.root_element().attribute("width").unwrap().parse().unwrap()
        };
        assert!(width(&wide) > width(&narrow));
    }

    #[test]
    fn test_markup_is_escaped() {
        let svg = render_tree("t", "<script> & friends").unwrap();
        assert!(svg.contains("&lt;script&gt; &amp; friends"));
    }
}
