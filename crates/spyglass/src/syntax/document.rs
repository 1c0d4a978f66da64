//! Whole-document checking
//!
//! Walks the source line by line: the first meaningful segment must be a
//! flowchart header, every following segment must parse as a statement, and
//! `subgraph`/`end` pairs must balance.

use tracing::{debug, trace};

use super::grammar::{Statement, StatementParser};
use super::header::{detect_header, Header};
use crate::core::{DiagramError, Direction};

/// A statement together with the 1-based line it came from
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedStatement {
    pub line: usize,
    pub statement: Statement,
}

/// A successfully parsed flowchart document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub direction: Direction,
    pub statements: Vec<LocatedStatement>,
}

/// Split a line on `;` outside of double quotes
pub(crate) fn split_statements(line: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                segments.push(&line[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&line[start..]);

    segments
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with("%%")
}

/// Parse a complete flowchart document
pub fn parse_document(text: &str) -> Result<Document, DiagramError> {
    if text.trim().is_empty() {
        return Err(DiagramError::MissingSource);
    }

    let parser = StatementParser::new();
    let mut direction = None;
    let mut statements = Vec::new();
    let mut open_subgraphs: Vec<usize> = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        if line.trim().is_empty() || is_comment(line) {
            continue;
        }

        for segment in split_statements(line) {
            if direction.is_none() {
                direction = Some(match detect_header(segment) {
                    Some(Header::Flowchart(dir)) => dir,
                    Some(Header::BadDirection(token)) => {
                        return Err(DiagramError::parse_error(
                            format!("Invalid direction `{}`, expected TD, TB, BT, LR or RL", token),
                            line_number,
                        ));
                    }
                    Some(Header::Other(keyword)) => {
                        return Err(DiagramError::UnsupportedDiagram {
                            diagram_type: keyword,
                        });
                    }
                    None => {
                        return Err(DiagramError::parse_error(
                            format!(
                                "Expected a diagram header such as `graph TD`, found `{}`",
                                segment
                            ),
                            line_number,
                        ));
                    }
                });
                continue;
            }

            let statement = parser
                .parse_statement(segment)
                .map_err(|message| DiagramError::parse_error(message, line_number))?;
            trace!(line = line_number, ?statement, "Parsed statement");

            match &statement {
                Statement::SubgraphStart { .. } => open_subgraphs.push(line_number),
                Statement::End => {
                    if open_subgraphs.pop().is_none() {
                        return Err(DiagramError::parse_error(
                            "Unexpected `end` without an open subgraph",
                            line_number,
                        ));
                    }
                }
                _ => {}
            }

            statements.push(LocatedStatement {
                line: line_number,
                statement,
            });
        }
    }

    if let Some(line) = open_subgraphs.pop() {
        return Err(DiagramError::parse_error("Unclosed subgraph", line));
    }

    let direction = direction.ok_or(DiagramError::MissingSource)?;
    debug!(%direction, statements = statements.len(), "Parsed flowchart document");

    Ok(Document {
        direction,
        statements,
    })
}
