//! Diagram header detection
//!
//! Recognizes the declaration line that opens a diagram (`graph TD`,
//! `flowchart LR`, `sequenceDiagram`, ...). Only flowchart headers can be
//! rendered; the other keywords are still recognized so the repair cascade
//! does not bolt a flowchart header onto them.

use tracing::trace;

use crate::core::Direction;

/// Keywords that open a flowchart
const FLOWCHART_KEYWORDS: [&str; 2] = ["graph", "flowchart"];

/// Keywords of other Mermaid diagram types
const OTHER_KEYWORDS: [&str; 12] = [
    "sequenceDiagram",
    "classDiagram",
    "stateDiagram",
    "stateDiagram-v2",
    "erDiagram",
    "gantt",
    "pie",
    "gitGraph",
    "mindmap",
    "journey",
    "timeline",
    "quadrantChart",
];

/// The default header used when a source has none
pub const DEFAULT_HEADER: &str = "graph TD";

/// A recognized header line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    /// `graph` / `flowchart` with a valid (or absent) direction
    Flowchart(Direction),
    /// `graph` / `flowchart` followed by something that is not a direction
    BadDirection(String),
    /// Another diagram type's keyword
    Other(String),
}

/// Classify a single header segment (text before the first `;`)
pub fn detect_header(segment: &str) -> Option<Header> {
    let segment = segment.trim().trim_end_matches(';').trim();
    let mut parts = segment.split_whitespace();
    let keyword = parts.next()?;

    if FLOWCHART_KEYWORDS
        .iter()
        .any(|kw| kw.eq_ignore_ascii_case(keyword))
    {
        let header = match parts.next() {
            None => Header::Flowchart(Direction::TopDown),
            Some(token) => match token.parse::<Direction>() {
                Ok(direction) if parts.next().is_none() => Header::Flowchart(direction),
                _ => Header::BadDirection(segment[keyword.len()..].trim().to_string()),
            },
        };
        trace!(?header, "Detected flowchart header");
        return Some(header);
    }

    if parts.next().is_none() && OTHER_KEYWORDS.contains(&keyword) {
        return Some(Header::Other(keyword.to_string()));
    }

    None
}

/// True when the first meaningful segment of `text` is a recognized header
///
/// Blank lines and `%%` comments are skipped, the same way the document
/// parser skips them before it expects the header.
pub fn has_header(text: &str) -> bool {
    text.lines()
        .find(|line| !line.trim().is_empty() && !line.trim_start().starts_with("%%"))
        .and_then(|line| line.split(';').map(str::trim).find(|s| !s.is_empty()))
        .is_some_and(|segment| detect_header(segment).is_some())
}
