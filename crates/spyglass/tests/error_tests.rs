//! Tests for core error types

use spyglass::core::{DiagramError, ErrorKind};

#[test]
fn test_parse_error() {
    let error = DiagramError::parse_error("Invalid syntax", 5);
    let error_msg = format!("{}", error);
    assert!(error_msg.contains("Parse error"));
    assert!(error_msg.contains("Invalid syntax"));
    assert!(error_msg.contains("line 5"));
}

#[test]
fn test_render_failure_message_is_distinct() {
    let render = DiagramError::render_failure("bad layout").to_string();
    let parse = DiagramError::parse_error("bad layout", 1).to_string();
    assert!(render.starts_with("Diagram render failed"));
    assert_ne!(render, parse);
}

#[test]
fn test_malformed_vector() {
    let error = DiagramError::malformed_vector("unexpected end of stream");
    assert!(error.to_string().contains("not a valid SVG"));
    assert_eq!(error.kind(), ErrorKind::RenderFailure);
}

#[test]
fn test_config_error() {
    let error = DiagramError::config("minZoom above maxZoom");
    assert!(error.to_string().contains("Configuration error"));
}

#[test]
fn test_error_kind_serialization() {
    let json = serde_json::to_string(&ErrorKind::MissingContent).unwrap();
    assert_eq!(json, "\"missingContent\"");
}

#[test]
fn test_error_is_std_error() {
    let error: Box<dyn std::error::Error> = Box::new(DiagramError::MissingContent);
    assert!(error.to_string().contains("Nothing to export"));
}
