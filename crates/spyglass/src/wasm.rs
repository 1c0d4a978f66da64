//! WebAssembly bindings for Spyglass
//!
//! Browser-facing wrappers around the validator, the render engine, the
//! exporter and the viewport. Structured results cross the boundary as JSON
//! strings.

use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{FutureExt, LocalBoxFuture};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::core::{DiagramError, DiagramKind, DiagramSource, Point, Size, ViewerConfig};
use crate::engine::{FrameClock, RenderEngine};
use crate::export::{sanitize_filename, SvgExporter, SVG_MIME_TYPE};
use crate::repair::Validator;
use crate::service::FlowchartService;
use crate::viewport::{ViewportController, TRANSFORM_ORIGIN};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_name = requestAnimationFrame)]
    fn request_animation_frame(callback: &Closure<dyn FnMut()>) -> Result<i32, JsValue>;
}

/// Initialize WASM module
///
/// Sets up panic hooks and logging for better error messages in the browser.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    use crate::core::logging::init_logging;
    let _ = init_logging(Some("info"), None);
}

/// Waits for the browser's next animation frame
struct AnimationFrame;

impl FrameClock for AnimationFrame {
    fn next_frame(&self) -> LocalBoxFuture<'static, ()> {
        let (tx, rx) = oneshot::channel::<()>();
        let callback = Closure::once(move || {
            let _ = tx.send(());
        });
        // Without a paint cycle (workers) the frame is skipped
        let scheduled = request_animation_frame(&callback).is_ok();
        async move {
            if scheduled {
                let _ = rx.await;
            }
            drop(callback);
        }
        .boxed_local()
    }
}

fn to_js(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn to_json(value: &impl Serialize) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(to_js)
}

fn parse_kind(kind: Option<String>) -> DiagramKind {
    match kind.as_deref() {
        Some("tree") => DiagramKind::Tree,
        _ => DiagramKind::Graph,
    }
}

fn parse_config(config_json: Option<String>) -> Result<ViewerConfig, JsValue> {
    match config_json {
        Some(json) => ViewerConfig::from_json(&json).map_err(to_js),
        None => Ok(ViewerConfig::default()),
    }
}

/// Repair and check diagram text
///
/// Returns a JSON `{isValid, code, error, errorKind, appliedFix}` object.
#[wasm_bindgen(js_name = validateDiagram)]
pub async fn validate_diagram(text: String, kind: Option<String>) -> Result<String, JsValue> {
    let validator = Validator::new(Rc::new(FlowchartService::new()));
    let validation = validator
        .validate(&DiagramSource::new(text, parse_kind(kind)))
        .await;
    to_json(&validation)
}

/// Render diagram text to SVG
///
/// Resolves after the next animation frame with a JSON
/// `{status, validatedText, vectorPayload, errorDetail, errorKind}` object.
#[wasm_bindgen(js_name = renderDiagram)]
pub async fn render_diagram(text: String, kind: Option<String>) -> Result<String, JsValue> {
    let engine =
        RenderEngine::with_clock(Rc::new(FlowchartService::new()), Rc::new(AnimationFrame));
    let result = engine
        .render(DiagramSource::new(text, parse_kind(kind)))
        .await;
    to_json(&result)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportView {
    filename: String,
    mime_type: &'static str,
    text: String,
}

/// Add the export background to a rendered SVG and name the file
///
/// Returns a JSON `{filename, mimeType, text}` object; the page turns it into
/// a download.
#[wasm_bindgen(js_name = exportDiagram)]
pub fn export_diagram(
    svg: &str,
    title: &str,
    config_json: Option<String>,
) -> Result<String, JsValue> {
    if svg.trim().is_empty() {
        return Err(to_js(DiagramError::MissingContent));
    }
    let config = parse_config(config_json)?;
    let exporter = SvgExporter::new(config.export);
    let text = exporter.with_background(svg).map_err(to_js)?;
    to_json(&ExportView {
        filename: sanitize_filename(title, &exporter.config().suffix),
        mime_type: SVG_MIME_TYPE,
        text,
    })
}

/// Zoom and pan state for one open viewer
#[wasm_bindgen]
pub struct Viewport {
    inner: ViewportController,
}

#[wasm_bindgen]
impl Viewport {
    /// Create a viewport from an optional JSON viewer configuration
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<Viewport, JsValue> {
        let config = parse_config(config_json)?;
        Ok(Self {
            inner: ViewportController::new(config.viewport),
        })
    }

    #[wasm_bindgen(getter)]
    pub fn zoom(&self) -> f64 {
        self.inner.zoom()
    }

    #[wasm_bindgen(js_name = zoomIn)]
    pub fn zoom_in(&mut self) -> f64 {
        self.inner.zoom_in()
    }

    #[wasm_bindgen(js_name = zoomOut)]
    pub fn zoom_out(&mut self) -> f64 {
        self.inner.zoom_out()
    }

    /// Fit `svg` into the container; `measured_*` is the fallback bounding box
    pub fn fit(
        &mut self,
        svg: &str,
        container_width: f64,
        container_height: f64,
        measured_width: Option<f64>,
        measured_height: Option<f64>,
    ) -> f64 {
        let measured = measured_width
            .zip(measured_height)
            .map(|(w, h)| Size::new(w, h));
        self.inner
            .fit_svg(svg, Size::new(container_width, container_height), measured)
    }

    #[wasm_bindgen(js_name = beginDrag)]
    pub fn begin_drag(&mut self, x: f64, y: f64) -> bool {
        self.inner.begin_drag(Point::new(x, y))
    }

    #[wasm_bindgen(js_name = continueDrag)]
    pub fn continue_drag(&mut self, x: f64, y: f64) -> bool {
        self.inner.continue_drag(Point::new(x, y))
    }

    #[wasm_bindgen(js_name = endDrag)]
    pub fn end_drag(&mut self) {
        self.inner.end_drag();
    }

    /// CSS `transform` value for the content element
    pub fn transform(&self) -> String {
        self.inner.transform().to_string()
    }

    /// CSS `transform-origin` value to pair with [`Viewport::transform`]
    #[wasm_bindgen(js_name = transformOrigin)]
    pub fn transform_origin() -> String {
        TRANSFORM_ORIGIN.to_string()
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }
}
