//! Command-line interface for the spyglass utility
//!
//! Repairs, validates, renders and exports flowchart text, and computes the
//! initial viewport fit a viewer would apply.

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::executor::block_on;
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info};

use crate::colorizer::{numbered_listing, status_mark, ColorChoice};
use spyglass::core::logging::init_logging;
use spyglass::export::{deliver, FileSink};
use spyglass::prelude::*;
use spyglass::repair::pre_pass;
use spyglass::viewport::TRANSFORM_ORIGIN;

/// Spyglass - Repair, render and export flowchart diagrams
#[derive(Parser)]
#[command(name = "spyglass")]
#[command(about = "Repair, validate, render and export generated flowchart diagrams as SVG")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Viewer configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Set log level (trace|debug|info|warn|error)
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Set log format (compact|pretty|json)
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Log level options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

/// Kind of input text
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq, Default)]
pub enum KindChoice {
    /// Flowchart text, repaired before rendering
    #[default]
    Graph,
    /// Plain directory tree dump
    Tree,
}

impl From<KindChoice> for DiagramKind {
    fn from(value: KindChoice) -> Self {
        match value {
            KindChoice::Graph => DiagramKind::Graph,
            KindChoice::Tree => DiagramKind::Tree,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Repair and check flowchart text
    Validate {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print the validation result as JSON
        #[arg(long)]
        json: bool,

        /// When to use colors in output
        #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
        color: ColorChoice,
    },

    /// Apply only the always-safe normalization fixes
    Normalize {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render a diagram to SVG
    Render {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file for the SVG (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Kind of input text
        #[arg(long, value_enum, default_value_t = KindChoice::Graph)]
        kind: KindChoice,
    },

    /// Render a diagram and save it as a standalone SVG with a background
    Export {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Title used to name the file (defaults to the input file name)
        #[arg(short, long)]
        title: Option<String>,

        /// Directory to write into
        #[arg(short = 'd', long, default_value = ".")]
        out_dir: PathBuf,

        /// Kind of input text
        #[arg(long, value_enum, default_value_t = KindChoice::Graph)]
        kind: KindChoice,
    },

    /// Compute the initial zoom for a rendered diagram in a container
    Fit {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Container width in pixels
        #[arg(long, default_value_t = 800.0)]
        width: f64,

        /// Container height in pixels
        #[arg(long, default_value_t = 600.0)]
        height: f64,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FitReport {
    zoom: f64,
    transform: String,
    transform_origin: &'static str,
}

/// Main CLI application
pub struct SpyglassApp {
    config: ViewerConfig,
    service: Rc<FlowchartService>,
}

impl SpyglassApp {
    /// Create a new application instance with default settings
    pub fn new() -> Self {
        Self::with_config(ViewerConfig::default())
    }

    pub fn with_config(config: ViewerConfig) -> Self {
        Self {
            config,
            service: Rc::new(FlowchartService::new()),
        }
    }

    /// Build the application for `cli`, loading `--config` when given
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => ViewerConfig::load(path)
                .map_err(|e| anyhow!("Failed to load config '{}': {}", path.display(), e))?,
            None => ViewerConfig::default(),
        };
        Ok(Self::with_config(config))
    }

    #[cfg(test)]
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Run the application with the given CLI arguments
    pub fn run(&mut self, cli: Cli) -> Result<()> {
        // Environment variables take precedence over flags
        let log_level_str = std::env::var("SPYGLASS_LOG_LEVEL")
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .or_else(|| Some(cli.log_level.as_str().to_string()));

        let log_format_str = std::env::var("SPYGLASS_LOG_FORMAT")
            .ok()
            .or_else(|| Some(cli.log_format.as_str().to_string()));

        if let Err(e) = init_logging(log_level_str.as_deref(), log_format_str.as_deref()) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        if cli.verbose {
            eprintln!("Spyglass v{}", env!("CARGO_PKG_VERSION"));
        }

        match cli.command {
            Commands::Validate { input, json, color } => {
                self.validate_command(input, json, color, cli.verbose)
            }
            Commands::Normalize { input, output } => self.normalize_command(input, output),
            Commands::Render {
                input,
                output,
                kind,
            } => self.render_command(input, output, kind, cli.verbose),
            Commands::Export {
                input,
                title,
                out_dir,
                kind,
            } => self.export_command(input, title, out_dir, kind, cli.verbose),
            Commands::Fit {
                input,
                width,
                height,
            } => self.fit_command(input, width, height),
        }
    }

    fn host(&self) -> ThumbnailHost {
        ThumbnailHost::new(self.service.clone(), &self.config)
    }

    /// Handle the validate command
    fn validate_command(
        &self,
        input: Option<PathBuf>,
        json: bool,
        color: ColorChoice,
        verbose: bool,
    ) -> Result<()> {
        let content = self.read_input(input)?;
        if verbose {
            eprintln!("Read {} bytes of input", content.len());
        }

        let validation = self.validate(&content);
        if json {
            println!("{}", serde_json::to_string_pretty(&validation)?);
        } else {
            let color = color.enabled(None);
            match (&validation.error, validation.applied_fix) {
                (None, None) => println!("{} Valid flowchart", status_mark(true, color)),
                (None, Some(fix)) => println!(
                    "{} Valid flowchart after repair ({})",
                    status_mark(true, color),
                    fix
                ),
                (Some(error), _) => {
                    println!("{} {}", status_mark(false, color), error);
                    if !validation.code.is_empty() {
                        println!("{}", numbered_listing(&validation.code, color));
                    }
                }
            }
        }

        if validation.is_valid {
            Ok(())
        } else {
            Err(anyhow!(
                "{}",
                validation.error.unwrap_or_else(|| "invalid diagram".to_string())
            ))
        }
    }

    /// Repair `content` against the built-in grammar
    pub fn validate(&self, content: &str) -> Validation {
        let validator = Validator::new(self.service.clone());
        block_on(validator.validate_text(content))
    }

    /// Handle the normalize command
    fn normalize_command(&self, input: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
        let content = self.read_input(input)?;
        self.write_output(output, &pre_pass(&content))
    }

    /// Render `content` and return the SVG payload
    pub fn render(&self, content: &str, kind: KindChoice) -> Result<String> {
        let engine = RenderEngine::new(self.service.clone());
        let result = block_on(engine.render(DiagramSource::new(content, kind.into())));
        match result {
            RenderResult::Success { vector_payload, .. } => Ok(vector_payload),
            RenderResult::Error { error_detail, .. } => Err(anyhow!(error_detail)),
            other => Err(anyhow!("render did not settle: {:?}", other.status())),
        }
    }

    /// Handle the render command
    fn render_command(
        &self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        kind: KindChoice,
        verbose: bool,
    ) -> Result<()> {
        let content = self.read_input(input)?;
        let svg = self.render(&content, kind)?;
        if verbose {
            eprintln!("Rendered {} bytes of SVG", svg.len());
        }
        self.write_output(output, &svg)
    }

    /// Handle the export command
    fn export_command(
        &self,
        input: Option<PathBuf>,
        title: Option<String>,
        out_dir: PathBuf,
        kind: KindChoice,
        verbose: bool,
    ) -> Result<()> {
        let title = title
            .or_else(|| input.as_deref().and_then(title_from_path))
            .unwrap_or_else(|| "diagram".to_string());
        let content = self.read_input(input)?;
        let path = self.export(&content, &title, &out_dir, kind)?;
        if verbose {
            eprintln!("Exported diagram");
        }
        println!("{}", path.display());
        Ok(())
    }

    /// Render `content` and write the export into `out_dir`
    pub fn export(
        &self,
        content: &str,
        title: &str,
        out_dir: &Path,
        kind: KindChoice,
    ) -> Result<PathBuf> {
        let mut host = self.host();
        let (graph, tree) = match kind {
            KindChoice::Graph => (Some(content), None),
            KindChoice::Tree => (None, Some(content)),
        };
        let pending = host
            .load(graph, tree)
            .ok_or_else(|| anyhow!("No diagram source provided"))?;
        let result = block_on(pending);
        if let Some(detail) = result.error_detail() {
            bail!("{}", detail);
        }

        let artifact = host.export(title)?;
        let mut sink = FileSink::new(out_dir);
        deliver(&mut sink, &artifact)?;
        info!(filename = %artifact.filename, "Export delivered");
        sink.delivered()
            .last()
            .cloned()
            .ok_or_else(|| anyhow!("export was not written"))
    }

    /// Handle the fit command
    fn fit_command(&self, input: Option<PathBuf>, width: f64, height: f64) -> Result<()> {
        let content = self.read_input(input)?;
        let report = self.fit(&content, Size::new(width, height))?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }

    fn fit(&self, content: &str, container: Size) -> Result<FitReport> {
        let mut host = self.host();
        let pending = host
            .load(Some(content), None)
            .ok_or_else(|| anyhow!("No diagram source provided"))?;
        let result = block_on(pending);
        if let Some(detail) = result.error_detail() {
            bail!("{}", detail);
        }

        host.open();
        host.on_render_ready(container, None);
        let viewport = host
            .viewport()
            .ok_or_else(|| anyhow!("viewer is not open"))?;
        debug!(zoom = viewport.zoom(), "Computed fit");
        Ok(FitReport {
            zoom: viewport.zoom(),
            transform: viewport.transform().to_string(),
            transform_origin: TRANSFORM_ORIGIN,
        })
    }

    /// Read input from file or stdin
    pub fn read_input(&self, input: Option<PathBuf>) -> Result<String> {
        match input {
            Some(path) if path.to_string_lossy() != "-" => fs::read_to_string(&path)
                .map_err(|e| anyhow!("Failed to read input file '{}': {}", path.display(), e)),
            _ => {
                let mut content = String::new();
                io::stdin().read_to_string(&mut content)?;
                Ok(content)
            }
        }
    }

    /// Write output to file or stdout
    pub fn write_output(&self, output: Option<PathBuf>, content: &str) -> Result<()> {
        match output {
            Some(path) if path.to_string_lossy() != "-" => {
                fs::write(&path, content).map_err(|e| {
                    anyhow!("Failed to write output file '{}': {}", path.display(), e)
                })?;
            }
            _ => {
                if content.is_empty() || content.ends_with('\n') {
                    print!("{}", content);
                } else {
                    println!("{}", content);
                }
                io::stdout().flush()?;
            }
        }
        Ok(())
    }
}

impl Default for SpyglassApp {
    fn default() -> Self {
        Self::new()
    }
}

fn title_from_path(path: &Path) -> Option<String> {
    if path.to_str() == Some("-") {
        return None;
    }
    path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_cli_parsing_render_command() {
        let args = vec![
            "spyglass", "render", "--input", "graph.mmd", "--output", "graph.svg", "--kind", "tree",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Render {
                input,
                output,
                kind,
            } => {
                assert_eq!(input.unwrap().to_string_lossy(), "graph.mmd");
                assert_eq!(output.unwrap().to_string_lossy(), "graph.svg");
                assert_eq!(kind, KindChoice::Tree);
            }
            _ => panic!("Expected Render command"),
        }
    }

    #[test]
    fn test_cli_parsing_export_defaults() {
        let cli = Cli::try_parse_from(["spyglass", "export"]).unwrap();
        match cli.command {
            Commands::Export {
                title,
                out_dir,
                kind,
                ..
            } => {
                assert!(title.is_none());
                assert_eq!(out_dir, PathBuf::from("."));
                assert_eq!(kind, KindChoice::Graph);
            }
            _ => panic!("Expected Export command"),
        }
    }

    #[test]
    fn test_cli_parsing_validate_command() {
        let cli =
            Cli::try_parse_from(["spyglass", "validate", "--json", "--color", "never"]).unwrap();
        match cli.command {
            Commands::Validate { input, json, color } => {
                assert!(input.is_none());
                assert!(json);
                assert_eq!(color, ColorChoice::Never);
            }
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "spyglass",
            "fit",
            "--width",
            "400",
            "--config",
            "viewer.json",
            "--verbose",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("viewer.json")));
        assert_eq!(cli.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_from_cli_loads_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        fs::write(&path, r#"{"viewport": {"minZoom": 0.5, "zoomStep": 0.1}}"#).unwrap();

        let cli = Cli::try_parse_from([
            "spyglass",
            "normalize",
            "--config",
            path.to_str().unwrap(),
        ])
        .unwrap();
        let app = SpyglassApp::from_cli(&cli).unwrap();
        assert_eq!(app.config().viewport.zoom_step, 0.1);
    }

    #[test]
    fn test_from_cli_rejects_bad_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        fs::write(&path, r#"{"viewport": {"minZoom": 9.0}}"#).unwrap();

        let cli =
            Cli::try_parse_from(["spyglass", "normalize", "--config", path.to_str().unwrap()]).unwrap();
        assert!(SpyglassApp::from_cli(&cli).is_err());
    }

    #[test]
    fn test_read_input_from_file() {
        let app = SpyglassApp::new();
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("graph.mmd");
        fs::write(&file_path, "A-->B").unwrap();

        assert_eq!(app.read_input(Some(file_path)).unwrap(), "A-->B");
    }

    #[test]
    fn test_write_output_to_file() {
        let app = SpyglassApp::new();
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("out.svg");

        app.write_output(Some(file_path.clone()), "<svg/>").unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "<svg/>");
    }

    #[test]
    fn test_validate_repairs() {
        let validation = SpyglassApp::new().validate("A[src/main.rs]-->B");
        assert!(validation.is_valid);
        assert_eq!(validation.code, "graph TD\nA[\"src/main.rs\"]-->B");
    }

    #[test]
    fn test_render_graph_and_tree() {
        let app = SpyglassApp::new();
        assert!(app.render("A-->B", KindChoice::Graph).unwrap().contains("spyglass-flowchart"));
        assert!(app.render("src/", KindChoice::Tree).unwrap().contains("spyglass-tree"));
        assert!(app.render("", KindChoice::Graph).is_err());
    }

    #[test]
    fn test_export_writes_file() {
        let app = SpyglassApp::new();
        let dir = tempdir().unwrap();
        let path = app
            .export("A-->B", "team/service map", dir.path(), KindChoice::Graph)
            .unwrap();
        assert_eq!(path, dir.path().join("teamservice map-diagram.svg"));
        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("spyglass-background"));
    }

    #[test]
    fn test_export_fails_for_broken_source() {
        let app = SpyglassApp::new();
        let dir = tempdir().unwrap();
        let result = app.export("A --> B\nB ->> C", "x", dir.path(), KindChoice::Graph);
        assert!(result.is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_fit_report() {
        let app = SpyglassApp::new();
        let report = app.fit("A-->B", Size::new(800.0, 600.0)).unwrap();
        assert_eq!(report.zoom, 2.0);
        assert_eq!(report.transform, "translate(0px, 0px) scale(2)");
        assert_eq!(report.transform_origin, "center center");
    }

    #[test]
    fn test_title_from_path() {
        assert_eq!(title_from_path(Path::new("docs/arch.mmd")), Some("arch".to_string()));
        assert_eq!(title_from_path(Path::new("-")), None);
    }
}
