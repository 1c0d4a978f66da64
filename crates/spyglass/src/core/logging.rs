//! Logging infrastructure for the viewer pipeline
//!
//! Structured logging through `tracing`. Native builds install a
//! `tracing-subscriber` registry; wasm builds forward to the browser console
//! through `tracing-wasm`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use spyglass::core::logging::init_logging;
//!
//! // Defaults: info level, compact format
//! init_logging(None, None).unwrap();
//! ```
//!
//! # Environment Variables
//!
//! - `SPYGLASS_LOG_LEVEL`: trace|debug|info|warn|error|off
//! - `SPYGLASS_LOG_FORMAT`: compact|pretty|json
//! - `RUST_LOG`: standard `EnvFilter` directives, e.g.
//!   `RUST_LOG="info,spyglass::repair=trace"`
//!
//! # Targets
//!
//! Each stage logs under its module path, so the repair cascade, the render
//! engine, the viewport and the exporter can be filtered independently:
//!
//! ```bash
//! RUST_LOG="spyglass::engine=debug,spyglass::repair=trace" spyglass render -i graph.mmd
//! ```

use std::str::FromStr;

#[cfg(not(target_arch = "wasm32"))]
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

#[cfg(target_arch = "wasm32")]
use tracing_wasm::WASMLayerConfig;

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line output
    Compact,
    /// Multi-line output with source locations
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

impl LogFormat {
    /// Get all valid format names
    pub fn variants() -> &'static [&'static str] {
        &["compact", "pretty", "json"]
    }
}

/// Initialize the global tracing subscriber
///
/// `level` falls back to `SPYGLASS_LOG_LEVEL`, then `RUST_LOG`, then `info`.
/// `format` falls back to `SPYGLASS_LOG_FORMAT`, then `compact`.
///
/// Fails if the format is unknown or a global subscriber is already set.
pub fn init_logging(
    level: Option<&str>,
    format: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(target_arch = "wasm32")]
    {
        // The browser console has a single output format.
        let _ = (level, format);
        tracing_wasm::set_as_global_default_with_config(WASMLayerConfig::default());
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let log_level = level
            .map(|s| s.to_string())
            .or_else(|| std::env::var("SPYGLASS_LOG_LEVEL").ok())
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| "info".to_string());

        let log_format = format
            .map(|s| s.to_string())
            .or_else(|| std::env::var("SPYGLASS_LOG_FORMAT").ok())
            .unwrap_or_else(|| "compact".to_string());

        let filter = if log_level == "off" {
            EnvFilter::new("off")
        } else {
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&log_level))
                .unwrap_or_else(|_| EnvFilter::new("info"))
        };

        let format = LogFormat::from_str(&log_format)
            .map_err(|e| format!("Invalid log format: {}", e))?;

        match format {
            LogFormat::Compact => {
                Registry::default()
                    .with(filter)
                    .with(
                        fmt::Layer::default()
                            .with_writer(std::io::stderr)
                            .with_target(false)
                            .with_level(true)
                            .with_span_events(FmtSpan::NONE),
                    )
                    .try_init()?;
            }
            LogFormat::Pretty => {
                Registry::default()
                    .with(filter)
                    .with(
                        fmt::Layer::default()
                            .with_writer(std::io::stderr)
                            .with_target(true)
                            .with_file(true)
                            .with_line_number(true)
                            .with_span_events(FmtSpan::ACTIVE)
                            .pretty(),
                    )
                    .try_init()?;
            }
            LogFormat::Json => {
                Registry::default()
                    .with(filter)
                    .with(
                        fmt::Layer::default()
                            .with_writer(std::io::stderr)
                            .with_target(true)
                            .with_file(true)
                            .with_line_number(true)
                            .with_span_events(FmtSpan::CLOSE)
                            .json(),
                    )
                    .try_init()?;
            }
        }

        Ok(())
    }
}

/// Initialize logging with default settings (info level, compact format)
pub fn init_default_logging() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(None, None)
}
