//! Pre-pass fixes, run on every graph source before the first parse

use regex::{Captures, Regex};
use std::sync::OnceLock;

use super::RepairAttempt;
use crate::syntax::{has_header, DEFAULT_HEADER};

pub(super) const PRE_PASS: [RepairAttempt; 4] = [
    RepairAttempt {
        name: "default-header",
        applies: missing_header,
        apply: prepend_header,
    },
    RepairAttempt {
        name: "quote-path-labels",
        applies: has_path_label,
        apply: quote_path_labels,
    },
    RepairAttempt {
        name: "quote-non-latin-labels",
        applies: has_non_latin_label,
        apply: quote_non_latin_labels,
    },
    RepairAttempt {
        name: "collapse-blank-lines",
        applies: has_blank_run,
        apply: collapse_blank_lines,
    },
];

fn bracket_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\[([^\[\]"\n]+)\]"#).expect("valid regex"))
}

fn blank_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?P<lead>^|\n)([ \t]*\n){3,}").expect("valid regex"))
}

fn missing_header(text: &str) -> bool {
    !has_header(text)
}

fn prepend_header(text: &str) -> String {
    format!("{}\n{}", DEFAULT_HEADER, text)
}

/// `[/x/]`, `[/x\]`, `[\x\]` and `[(x)]` are shapes, not labels
fn is_shape_delimited(inner: &str) -> bool {
    let slashed = |c: char| c == '/' || c == '\\';
    let mut chars = inner.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if slashed(first) && slashed(last) => true,
        (Some('('), Some(')')) => true,
        _ => false,
    }
}

fn label_needs_quotes(inner: &str, needs: fn(&str) -> bool) -> bool {
    !is_shape_delimited(inner) && needs(inner)
}

fn any_label(text: &str, needs: fn(&str) -> bool) -> bool {
    bracket_label_regex()
        .captures_iter(text)
        .any(|caps| label_needs_quotes(&caps[1], needs))
}

fn quote_labels(text: &str, needs: fn(&str) -> bool) -> String {
    bracket_label_regex()
        .replace_all(text, |caps: &Captures| {
            let inner = &caps[1];
            if label_needs_quotes(inner, needs) {
                format!("[\"{}\"]", inner.trim())
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

fn contains_path_separator(label: &str) -> bool {
    label.contains('/') || label.contains('\\')
}

fn has_path_label(text: &str) -> bool {
    any_label(text, contains_path_separator)
}

fn quote_path_labels(text: &str) -> String {
    quote_labels(text, contains_path_separator)
}

/// Alphabetic characters outside Basic Latin and the Latin extension blocks
fn contains_non_latin(label: &str) -> bool {
    label.chars().any(|c| {
        c.is_alphabetic()
            && !c.is_ascii()
            && !('\u{00C0}'..='\u{024F}').contains(&c)
            && !('\u{1E00}'..='\u{1EFF}').contains(&c)
    })
}

fn has_non_latin_label(text: &str) -> bool {
    any_label(text, contains_non_latin)
}

fn quote_non_latin_labels(text: &str) -> String {
    quote_labels(text, contains_non_latin)
}

fn has_blank_run(text: &str) -> bool {
    blank_run_regex().is_match(text)
}

fn collapse_blank_lines(text: &str) -> String {
    blank_run_regex()
        .replace_all(text, "${lead}\n\n")
        .into_owned()
}
