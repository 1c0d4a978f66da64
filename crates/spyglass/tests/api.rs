//! Integration tests for the public API

use spyglass::prelude::*;
use spyglass::{normalize, render, render_source, validate};

#[test]
fn test_render_simple_chain() {
    let svg = render("graph LR; A-->B-->C").unwrap();
    for id in ["A", "B", "C"] {
        assert!(svg.contains(&format!("-node-{}\"", id)), "missing node {}", id);
    }
}

#[test]
fn test_render_with_labels() {
    let svg = render("graph LR; A[Start]-->B[End]").unwrap();
    assert!(svg.contains(">Start<"));
    assert!(svg.contains(">End<"));
}

#[test]
fn test_render_is_well_formed_xml() {
    let svg =
        render("graph TD\nA{Decision?}-->|yes & no| B((Done))\nsubgraph Core\nB-->C\nend").unwrap();
    let doc = roxmltree::Document::parse(&svg).unwrap();
    assert_eq!(doc.root_element().tag_name().name(), "svg");
    assert!(doc.root_element().attribute("viewBox").is_some());
}

#[test]
fn test_render_unsupported_diagram() {
    let err = render("sequenceDiagram\nAlice->>Bob: Hi").unwrap_err();
    assert!(err.to_string().contains("Unsupported diagram type"));
}

#[test]
fn test_normalize_only_runs_safe_fixes() {
    // Arrow spacing is a recovery fix, not a pre-pass one
    assert_eq!(normalize("A - -> B"), "graph TD\nA - -> B");
}

#[test]
fn test_validate_reports_applied_fix() {
    let validation = validate("graph TD\nsubgraph   API\nA-->B\nEnd");
    assert!(validation.is_valid);
    assert_eq!(validation.applied_fix, Some("subgraph-header"));
}

#[test]
fn test_render_source_tree() {
    let source = DiagramSource::tree("crate/\n├── src/\n│   └── lib.rs");
    let svg = render_source(source).unwrap();
    assert!(svg.contains("lib.rs"));
    assert!(roxmltree::Document::parse(&svg).is_ok());
}

#[test]
fn test_keyword_named_node_still_gets_default_header() {
    for source in ["A-->B\npie", "A-->B\ngantt", "A-->B\ngraph --> C"] {
        let validation = validate(source);
        assert!(validation.is_valid, "{} should validate", source);
        assert!(validation.code.starts_with("graph TD\n"));
    }
}

#[test]
fn test_leading_blank_lines_are_collapsed() {
    assert_eq!(normalize("\n\n\n\n\ngraph TD\nA-->B"), "\n\ngraph TD\nA-->B");
}
