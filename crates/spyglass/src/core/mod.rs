//! Core building blocks shared by every stage of the viewer
//!
//! Types, errors, configuration and logging. The pipeline stages themselves
//! live in sibling modules of the crate root.

mod config;
mod error;
pub mod logging;
mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;
