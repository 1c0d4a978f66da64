//! Flowchart dialect: header detection, statement grammar and document checks

mod document;
mod grammar;
mod header;

pub use document::{parse_document, Document, LocatedStatement};
pub use grammar::{Directive, Link, NodeRef, Statement, StatementParser};
pub use header::{detect_header, has_header, Header, DEFAULT_HEADER};
