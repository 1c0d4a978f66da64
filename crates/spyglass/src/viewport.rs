//! Zoom, pan and fit-to-content for rendered diagrams
//!
//! The controller owns a [`ViewportState`] and keeps its zoom inside the
//! configured bounds at all times. Hosts apply [`ViewportController::transform`]
//! to the element wrapping the rendered SVG.
//!
//! ```
//! use spyglass::core::{Point, Size};
//! use spyglass::viewport::{ViewportConfig, ViewportController};
//!
//! let mut viewport = ViewportController::new(ViewportConfig::coarse());
//! let zoom = viewport.fit_to_content(Size::new(400.0, 300.0), Size::new(800.0, 400.0));
//! assert!((zoom - 320.0 / 300.0).abs() < 1e-9);
//! assert_eq!(viewport.pan(), Point::ORIGIN);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

use crate::core::{DiagramError, Point, Size};

/// CSS `transform-origin` to pair with [`Transform`]'s CSS form
pub const TRANSFORM_ORIGIN: &str = "center center";

/// Zoom bounds and fit parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewportConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
    /// Upper bound for fit-to-content; fit never goes below `min_zoom`
    pub max_fit_zoom: f64,
    /// Margin kept free on every side when fitting
    pub padding: f64,
}

impl ViewportConfig {
    /// Step 0.25 within [0.2, 3.0]
    pub fn coarse() -> Self {
        Self {
            min_zoom: 0.2,
            max_zoom: 3.0,
            zoom_step: 0.25,
            max_fit_zoom: 2.0,
            padding: 40.0,
        }
    }

    /// Step 0.1 within [0.5, 3.0]
    pub fn fine() -> Self {
        Self {
            min_zoom: 0.5,
            zoom_step: 0.1,
            ..Self::coarse()
        }
    }

    /// Reject bounds that cannot hold the zoom invariant
    pub fn check(&self) -> Result<(), DiagramError> {
        let values = [
            self.min_zoom,
            self.max_zoom,
            self.zoom_step,
            self.max_fit_zoom,
            self.padding,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DiagramError::config("viewport values must be finite"));
        }
        if self.min_zoom <= 0.0 {
            return Err(DiagramError::config("minZoom must be positive"));
        }
        if self.min_zoom > self.max_zoom {
            return Err(DiagramError::config(format!(
                "minZoom {} exceeds maxZoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.zoom_step <= 0.0 {
            return Err(DiagramError::config("zoomStep must be positive"));
        }
        if self.max_fit_zoom < self.min_zoom {
            return Err(DiagramError::config(format!(
                "maxFitZoom {} is below minZoom {}",
                self.max_fit_zoom, self.min_zoom
            )));
        }
        if self.padding < 0.0 {
            return Err(DiagramError::config("padding must not be negative"));
        }
        Ok(())
    }

    pub fn clamp(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self::coarse()
    }
}

/// Zoom, pan and the active drag anchor
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportState {
    pub zoom: f64,
    pub pan: Point,
    /// Set only between pointer-down and pointer-up
    pub drag_anchor: Option<Point>,
}

impl ViewportState {
    fn initial(config: &ViewportConfig) -> Self {
        Self {
            zoom: config.clamp(1.0),
            pan: Point::ORIGIN,
            drag_anchor: None,
        }
    }
}

/// Display transform: translate by pan, then scale around the content center
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub translate: Point,
    pub scale: f64,
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "translate({}px, {}px) scale({})",
            self.translate.x, self.translate.y, self.scale
        )
    }
}

/// Intrinsic size of an SVG document
///
/// Reads `width`/`height` (unitless or `px`), then falls back to the
/// `viewBox` dimensions. Percentages and other units are ignored.
pub fn svg_content_size(svg: &str) -> Option<Size> {
    let doc = roxmltree::Document::parse(svg).ok()?;
    let root = doc.root_element();
    if root.tag_name().name() != "svg" {
        return None;
    }

    let length = |name: &str| {
        root.attribute(name)
            .map(|v| v.trim().trim_end_matches("px"))
            .and_then(|v| v.parse::<f64>().ok())
    };
    if let (Some(width), Some(height)) = (length("width"), length("height")) {
        let size = Size::new(width, height);
        if size.is_drawable() {
            return Some(size);
        }
    }

    let view_box: Vec<f64> = root
        .attribute("viewBox")?
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    match view_box.as_slice() {
        [_, _, width, height] => Some(Size::new(*width, *height)).filter(Size::is_drawable),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct ViewportController {
    config: ViewportConfig,
    state: ViewportState,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl ViewportController {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            state: ViewportState::initial(&config),
            config,
        }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn zoom(&self) -> f64 {
        self.state.zoom
    }

    pub fn pan(&self) -> Point {
        self.state.pan
    }

    pub fn is_dragging(&self) -> bool {
        self.state.drag_anchor.is_some()
    }

    /// Rounded to hundredths so repeated steps do not accumulate error
    fn step(&mut self, delta: f64) -> f64 {
        let target = ((self.state.zoom + delta) * 100.0).round() / 100.0;
        self.state.zoom = self.config.clamp(target);
        trace!(zoom = self.state.zoom, "Zoom changed");
        self.state.zoom
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.step(self.config.zoom_step)
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.step(-self.config.zoom_step)
    }

    /// Set an explicit zoom level, clamped to the bounds
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        if zoom.is_finite() {
            self.state.zoom = self.config.clamp(zoom);
        }
        self.state.zoom
    }

    /// Fit `content` inside `container`, keeping `padding` free on each side
    ///
    /// Resets pan. Content without a positive finite size leaves zoom at 1.0
    /// (clamped).
    pub fn fit_to_content(&mut self, content: Size, container: Size) -> f64 {
        self.state.pan = Point::ORIGIN;
        self.state.drag_anchor = None;

        if !content.is_drawable() {
            debug!(?content, "Degenerate content size, resetting zoom");
            self.state.zoom = self.config.clamp(1.0);
            return self.state.zoom;
        }

        let inset = 2.0 * self.config.padding;
        let scale = ((container.width - inset) / content.width)
            .min((container.height - inset) / content.height)
            .min(self.config.max_fit_zoom);
        let scale = if scale.is_finite() {
            scale
        } else {
            self.config.min_zoom
        };

        self.state.zoom = self.config.clamp(scale.max(self.config.min_zoom));
        debug!(zoom = self.state.zoom, ?content, ?container, "Fitted content");
        self.state.zoom
    }

    /// Fit an SVG document, falling back to a host-measured box when the
    /// markup carries no usable size
    pub fn fit_svg(&mut self, svg: &str, container: Size, measured: Option<Size>) -> f64 {
        let content = svg_content_size(svg)
            .or(measured)
            .unwrap_or_default();
        self.fit_to_content(content, container)
    }

    /// Arm a drag at `pointer`; refused at 100% zoom or below
    pub fn begin_drag(&mut self, pointer: Point) -> bool {
        if self.state.zoom <= 1.0 {
            trace!(zoom = self.state.zoom, "Drag refused, content already fits");
            return false;
        }
        self.state.drag_anchor = Some(pointer - self.state.pan);
        true
    }

    /// Move the pan with the pointer while a drag is armed
    pub fn continue_drag(&mut self, pointer: Point) -> bool {
        match self.state.drag_anchor {
            Some(anchor) => {
                self.state.pan = pointer - anchor;
                true
            }
            None => false,
        }
    }

    pub fn end_drag(&mut self) {
        self.state.drag_anchor = None;
    }

    pub fn transform(&self) -> Transform {
        Transform {
            translate: self.state.pan,
            scale: self.state.zoom,
        }
    }

    /// Zoom 1.0 (clamped), pan at origin, no drag
    pub fn reset(&mut self) {
        self.state = ViewportState::initial(&self.config);
    }
}
