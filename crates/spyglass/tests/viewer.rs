//! Host and viewport workflows

use std::rc::Rc;

use futures::executor::block_on;
use spyglass::prelude::*;
use spyglass::viewport::svg_content_size;

fn host(config: &ViewerConfig) -> ThumbnailHost {
    ThumbnailHost::new(Rc::new(FlowchartService::new()), config)
}

#[test]
fn test_fit_arithmetic() {
    let mut viewport = ViewportController::default();
    let zoom = viewport.fit_to_content(Size::new(400.0, 300.0), Size::new(800.0, 400.0));
    assert!((zoom - 320.0 / 300.0).abs() < 1e-9);
    assert_eq!(viewport.pan(), Point::ORIGIN);
}

#[test]
fn test_pan_translation() {
    let mut viewport = ViewportController::default();
    viewport.set_zoom(2.0);
    assert!(viewport.begin_drag(Point::new(10.0, 10.0)));
    assert!(viewport.continue_drag(Point::new(20.0, 20.0)));
    viewport.end_drag();
    assert_eq!(viewport.pan(), Point::new(10.0, 10.0));

    assert!(viewport.begin_drag(Point::new(100.0, 100.0)));
    assert_eq!(viewport.state().drag_anchor, Some(Point::new(90.0, 90.0)));
    viewport.continue_drag(Point::new(150.0, 120.0));
    assert_eq!(viewport.pan(), Point::new(60.0, 30.0));
    viewport.end_drag();
    assert!(!viewport.is_dragging());
}

#[test]
fn test_rendered_payload_has_measurable_size() {
    let svg = spyglass::render("graph LR\nA-->B-->C").unwrap();
    let size = svg_content_size(&svg).unwrap();
    assert!(size.width > size.height);
}

#[test]
fn test_modal_session() {
    let mut host = host(&ViewerConfig::default());
    let pending = host.load(Some("graph LR\nA-->B-->C-->D"), Some("src/\n  main.rs")).unwrap();
    block_on(pending);

    host.open();
    assert!(host.on_render_ready(Size::new(300.0, 200.0), None));
    let fitted = host.viewport().unwrap().zoom();
    assert!(fitted <= 2.0);

    // Tab switches leave the viewport alone
    assert!(host.select_tab(Tab::TreeText));
    assert_eq!(host.tree_text(), Some("src/\n  main.rs"));
    assert_eq!(host.viewport().unwrap().zoom(), fitted);

    let artifact = host.export("acme/widgets").unwrap();
    assert_eq!(artifact.filename, "acmewidgets-diagram.svg");

    host.close();
    assert!(!host.is_open());
}

#[test]
fn test_fine_viewport_config() {
    let config =
        ViewerConfig::from_json(r#"{"viewport": {"minZoom": 0.5, "zoomStep": 0.1}}"#).unwrap();
    let mut host = host(&config);
    host.open();
    let viewport = host.viewport_mut().unwrap();
    for _ in 0..20 {
        viewport.zoom_out();
    }
    assert_eq!(viewport.zoom(), 0.5);
    viewport.zoom_in();
    assert_eq!(viewport.zoom(), 0.6);
}
