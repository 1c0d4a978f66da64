//! Error types for the viewer pipeline
//!
//! Every failure the core can produce, from an empty source to an export
//! attempted before anything rendered.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Core error type for diagram processing
#[derive(Error, Debug)]
pub enum DiagramError {
    #[error("No diagram source provided")]
    MissingSource,

    #[error("Parse error on line {line}: {message}")]
    ParseError { message: String, line: usize },

    #[error("Diagram render failed: {message}")]
    RenderFailure { message: String },

    #[error("Nothing to export: no diagram has rendered successfully")]
    MissingContent,

    #[error("Rendered output is not a valid SVG document: {message}")]
    MalformedVector { message: String },

    #[error("Unsupported diagram type: {diagram_type}")]
    UnsupportedDiagram { diagram_type: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl DiagramError {
    pub fn parse_error(message: impl Into<String>, line: usize) -> Self {
        Self::ParseError {
            message: message.into(),
            line,
        }
    }

    pub fn render_failure(message: impl Into<String>) -> Self {
        Self::RenderFailure {
            message: message.into(),
        }
    }

    pub fn malformed_vector(message: impl Into<String>) -> Self {
        Self::MalformedVector {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Classification used by hosts to pick a presentation
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiagramError::MissingSource => ErrorKind::MissingSource,
            DiagramError::ParseError { .. } | DiagramError::UnsupportedDiagram { .. } => {
                ErrorKind::ParseError
            }
            DiagramError::RenderFailure { .. }
            | DiagramError::MalformedVector { .. }
            | DiagramError::Config { .. }
            | DiagramError::Io { .. } => ErrorKind::RenderFailure,
            DiagramError::MissingContent => ErrorKind::MissingContent,
        }
    }
}

/// Failure taxonomy surfaced to hosts alongside the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// No text was supplied
    MissingSource,
    /// The repair cascade could not produce parseable text
    ParseError,
    /// Validation passed but the rendering service rejected the text
    RenderFailure,
    /// Export attempted without a successful render
    MissingContent,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MissingSource => write!(f, "missing-source"),
            ErrorKind::ParseError => write!(f, "parse-error"),
            ErrorKind::RenderFailure => write!(f, "render-failure"),
            ErrorKind::MissingContent => write!(f, "missing-content"),
        }
    }
}
