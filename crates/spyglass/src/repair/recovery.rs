//! Recovery fixes, tried one at a time after a failed parse

use regex::{Captures, Regex};
use std::sync::OnceLock;

use super::RepairAttempt;
use crate::core::EdgeType;
use crate::syntax::detect_header;

pub(super) const RECOVERY: [RepairAttempt; 3] = [
    RepairAttempt {
        name: "arrow-spacing",
        applies: has_spaced_arrow,
        apply: normalize_arrow_spacing,
    },
    RepairAttempt {
        name: "node-identifiers",
        applies: has_dirty_identifier,
        apply: clean_node_identifiers,
    },
    RepairAttempt {
        name: "subgraph-header",
        applies: has_untidy_subgraph,
        apply: normalize_subgraph_headers,
    },
];

/// Connector patterns with optional inline whitespace, most specific first
fn arrow_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (r"-[ \t]*\.[ \t]*-[ \t]*>", "-.->"),
            (r"-[ \t]*\.[ \t]*-", "-.-"),
            (r"=[ \t]*=[ \t]*>", "==>"),
            (r"=[ \t]*=[ \t]*=", "==="),
            (r"-[ \t]*-[ \t]*>", "-->"),
            (r"-[ \t]*-[ \t]*-", "---"),
        ]
        .into_iter()
        .map(|(pattern, token)| (Regex::new(pattern).expect("valid regex"), token))
        .collect()
    })
}

fn has_inner_whitespace(token: &str) -> bool {
    token.contains([' ', '\t'])
}

fn has_spaced_arrow(text: &str) -> bool {
    arrow_rules().iter().any(|(re, _)| {
        re.find_iter(text)
            .any(|m| has_inner_whitespace(m.as_str()))
    })
}

fn normalize_arrow_spacing(text: &str) -> String {
    let mut out = text.to_string();
    for (re, token) in arrow_rules() {
        out = re
            .replace_all(&out, |caps: &Captures| {
                if has_inner_whitespace(&caps[0]) {
                    token.to_string()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();
    }
    out
}

const STATEMENT_KEYWORDS: [&str; 6] = [
    "subgraph",
    "end",
    "classdef",
    "class",
    "style",
    "linkstyle",
];

/// Header, comment, subgraph and directive segments carry no node ids
fn is_structural(segment: &str) -> bool {
    let trimmed = segment.trim();
    if trimmed.is_empty() || trimmed.starts_with("%%") || detect_header(trimmed).is_some() {
        return true;
    }
    let first = trimmed
        .split(|c: char| c.is_whitespace() || c == '"')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    STATEMENT_KEYWORDS.contains(&first.as_str())
}

/// Byte ranges of the node pieces in a statement, between connectors
///
/// Brackets and quotes are tracked so connector-like text inside a label is
/// not treated as a connector; `|label|` after a connector belongs to it.
fn node_pieces(segment: &str) -> Vec<(usize, usize)> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut i = 0;

    while i < segment.len() {
        let rest = &segment[i..];
        let Some(c) = rest.chars().next() else { break };

        if in_quotes {
            in_quotes = c != '"';
        } else if c == '"' {
            in_quotes = true;
        } else if matches!(c, '[' | '(' | '{') {
            depth += 1;
        } else if matches!(c, ']' | ')' | '}') {
            depth = depth.saturating_sub(1);
        } else if depth == 0 {
            if let Some(token) = EdgeType::TOKENS.iter().find(|t| rest.starts_with(*t)) {
                pieces.push((start, i));
                let mut end = i + token.len();
                let after = &segment[end..];
                let label_offset = after.len() - after.trim_start().len();
                if after.trim_start().starts_with('|') {
                    let label_start = end + label_offset + 1;
                    if let Some(close) = segment[label_start..].find('|') {
                        end = label_start + close + 1;
                    }
                }
                start = end;
                i = end;
                continue;
            }
        }
        i += c.len_utf8();
    }
    pieces.push((start, segment.len()));
    pieces
}

/// Strip identifier characters outside `[A-Za-z0-9_]` from one node piece
fn clean_piece(piece: &str) -> String {
    let core = piece.trim();
    if core.is_empty() {
        return piece.to_string();
    }
    let id_end = core
        .find(|c: char| matches!(c, '[' | '(' | '{' | '>'))
        .into_iter()
        .chain(core.find(":::"))
        .min()
        .unwrap_or(core.len());
    let (id, rest) = core.split_at(id_end);
    let cleaned: String = id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if cleaned.is_empty() || cleaned == id {
        return piece.to_string();
    }

    let leading = &piece[..piece.len() - piece.trim_start().len()];
    let trailing = &piece[piece.trim_end().len()..];
    format!("{}{}{}{}", leading, cleaned, rest, trailing)
}

fn clean_segment(segment: &str) -> String {
    if is_structural(segment) {
        return segment.to_string();
    }
    let mut out = String::with_capacity(segment.len());
    let mut last = 0;
    for (start, end) in node_pieces(segment) {
        out.push_str(&segment[last..start]);
        out.push_str(&clean_piece(&segment[start..end]));
        last = end;
    }
    out
}

/// Apply `f` to each `;`-separated segment outside quotes, keeping separators
fn map_segments(line: &str, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                out.push_str(&f(&line[start..i]));
                out.push(';');
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push_str(&f(&line[start..]));
    out
}

fn clean_node_identifiers(text: &str) -> String {
    text.split('\n')
        .map(|line| map_segments(line, clean_segment))
        .collect::<Vec<_>>()
        .join("\n")
}

fn has_dirty_identifier(text: &str) -> bool {
    clean_node_identifiers(text) != text
}

fn normalize_subgraph_headers(text: &str) -> String {
    let mut depth = 0usize;
    text.split('\n')
        .map(|line| {
            let body = line.trim_start();
            let indent = &line[..line.len() - body.len()];

            if let Some(keyword) = body.get(..8) {
                let rest = &body[8..];
                if keyword.eq_ignore_ascii_case("subgraph")
                    && (rest.is_empty() || rest.starts_with([' ', '\t', '"']))
                {
                    depth += 1;
                    let title = rest.trim();
                    return if title.is_empty() {
                        format!("{}subgraph", indent)
                    } else {
                        format!("{}subgraph {}", indent, title)
                    };
                }
            }

            if depth > 0 && body.trim_end().eq_ignore_ascii_case("end") {
                depth -= 1;
                return format!("{}end", indent);
            }

            line.to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn has_untidy_subgraph(text: &str) -> bool {
    normalize_subgraph_headers(text) != text
}
