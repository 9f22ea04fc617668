use super::*;
use crate::control::executor::InlineExecutor;
use crate::control::controller::ControllerConfig;
use crate::data::dataset::Dataset;
use crate::data::renderer::{LayerRenderer, OptionValue, RendererOption};
use crate::data::source::DataSource;
use crate::draw::transport::{PointerState, RecordingTransport};
use kurbo::{Point, Size};

struct Dots {
    subscriptions: Vec<String>,
}

impl LayerRenderer for Dots {
    fn name(&self) -> &str {
        "dots"
    }

    fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    fn options(&self) -> Vec<RendererOption> {
        vec![RendererOption::flag("show_dots", "Dots", true)]
    }

    fn layer_init(&mut self, scene: &mut Scene, parent: NodeId, view: &Dataset) -> anyhow::Result<()> {
        for (id, _) in view.iter() {
            let x = view.number(id, "x").unwrap_or_default();
            let y = view.number(id, "y").unwrap_or_default();
            scene.add_child(
                parent,
                RenderObject::circle(id, x, y, 10.0)
                    .with_layer("dots")
                    .with_row(id),
            )?;
        }
        Ok(())
    }

    fn render(
        &mut self,
        scene: &mut Scene,
        parent: NodeId,
        _view: &Dataset,
        options: &OptionValues,
    ) -> anyhow::Result<()> {
        let show = options.flag("show_dots");
        for id in scene.children(parent).to_vec() {
            scene.get_mut(id)?.props.visible = show;
        }
        Ok(())
    }

    fn tooltip(&self, view: &Dataset, row_id: Option<&str>) -> anyhow::Result<String> {
        let Some(id) = row_id else {
            return Ok(String::new());
        };
        Ok(format!("{id} at {}", view.number(id, "x").unwrap_or_default()))
    }
}

fn controller() -> Controller {
    let mut c = Controller::with_executor(ControllerConfig::default(), Box::new(InlineExecutor))
        .unwrap();
    let mut coords = Dataset::new();
    coords.set("P1", "x", 100.0);
    coords.set("P1", "y", 100.0);
    c.register_source(DataSource::manual("data_coords", coords))
        .unwrap();
    c.register_renderer(Box::new(Dots {
        subscriptions: vec!["data_coords".to_string()],
    }))
    .unwrap();
    c
}

fn ready_viewer(c: &mut Controller) -> (Viewer, RecordingTransport) {
    let transport = RecordingTransport::new(Size::new(400.0, 300.0));
    let mut viewer =
        Viewer::new("v1", ViewerConfig::default(), Box::new(transport.clone())).unwrap();
    viewer.on_ready(c).unwrap();
    (viewer, transport)
}

fn rest_pointer_at(transport: &RecordingTransport, x: f64, y: f64, elapsed_ms: f64) {
    transport
        .set_pointer(Some(PointerState {
            world: Point::new(x, y),
            page: Point::new(x + 5.0, y + 5.0),
            elapsed_ms,
        }))
        .unwrap();
}

#[test]
fn on_ready_builds_stage_and_default_options() {
    let mut c = controller();
    let (viewer, _) = ready_viewer(&mut c);

    let scene = viewer.scene().unwrap();
    let layers = viewer.layers().unwrap();
    assert_eq!(scene.parent(layers), Some(scene.root()));
    assert_eq!(scene.children(layers).len(), 1);
    assert!(!scene.get(scene.root()).unwrap().props.clickable);
    assert_eq!(
        viewer.options().get("show_dots"),
        Some(&OptionValue::Bool(true))
    );
}

#[test]
fn refresh_clears_then_flips_one_payload() {
    let mut c = controller();
    let (mut viewer, transport) = ready_viewer(&mut c);
    viewer.refresh(&mut c, 0.0).unwrap();

    let payloads = transport.payloads().unwrap();
    assert_eq!(payloads.len(), 1);
    let lines: Vec<&str> = payloads[0].lines().collect();
    assert_eq!(lines[0], "ctx_drawing.fillStyle = 'white';");
    assert_eq!(lines[1], "clear(ctx_drawing);");
    assert!(lines.contains(&"draw_ellipse(ctx_drawing,100,100,10,10,0,0,6.283185307179586,false);"));
    assert_eq!(lines.last(), Some(&"flip(ctx_drawing.canvas, ctx_display);"));
}

#[test]
fn options_drive_layer_render() {
    let mut c = controller();
    let (mut viewer, transport) = ready_viewer(&mut c);
    let mut opts = OptionValues::new();
    opts.set("show_dots", OptionValue::Bool(false));
    viewer.set_options(opts);
    viewer.refresh(&mut c, 0.0).unwrap();

    let payload = &transport.payloads().unwrap()[0];
    assert!(!payload.contains("draw_ellipse"));
}

#[test]
fn hover_waits_for_rest_then_shows_tooltip() {
    let mut c = controller();
    let (mut viewer, transport) = ready_viewer(&mut c);

    assert_eq!(viewer.check_hover(&c, 0.0).unwrap(), None);

    rest_pointer_at(&transport, 102.0, 100.0, 100.0);
    assert_eq!(viewer.check_hover(&c, 0.0).unwrap(), None);

    rest_pointer_at(&transport, 102.0, 100.0, 800.0);
    assert_eq!(
        viewer.check_hover(&c, 0.0).unwrap().as_deref(),
        Some("P1 at 100")
    );
    let shown = transport
        .last_presented(|p| matches!(p, Panel::Tooltip { .. }))
        .unwrap();
    assert_eq!(shown, Some(Some("P1 at 100".to_string())));

    rest_pointer_at(&transport, 300.0, 200.0, 800.0);
    assert_eq!(viewer.check_hover(&c, 0.0).unwrap(), None);
    let hidden = transport
        .last_presented(|p| matches!(p, Panel::Tooltip { .. }))
        .unwrap();
    assert_eq!(hidden, Some(None));
}

#[test]
fn primary_click_selects_and_shows_properties() {
    let mut c = controller();
    let (mut viewer, transport) = ready_viewer(&mut c);
    rest_pointer_at(&transport, 95.0, 95.0, 0.0);

    viewer.on_pointer_up(&c, 2, 0.0).unwrap();
    assert!(viewer.selection().is_none());

    viewer.on_pointer_up(&c, 0, 0.0).unwrap();
    let sel = viewer.selection().unwrap();
    assert_eq!(sel.row_id.as_deref(), Some("P1"));
    let props = transport
        .last_presented(|p| *p == Panel::Properties)
        .unwrap();
    assert_eq!(props, Some(Some("P1 at 100".to_string())));
}

#[test]
fn status_panel_lists_sources() {
    let mut c = controller();
    let (mut viewer, transport) = ready_viewer(&mut c);
    viewer.refresh_status(&c, 10.0).unwrap();
    let status = transport
        .last_presented(|p| *p == Panel::SourceStatus)
        .unwrap();
    assert_eq!(status, Some(Some("data_coords: never fetched".to_string())));
}

#[test]
fn background_image_is_declared_once_ready() {
    let mut c = controller();
    let transport = RecordingTransport::new(Size::new(10.0, 10.0));
    let config = ViewerConfig {
        background_image: Some("/static/plan.png".to_string()),
        ..ViewerConfig::default()
    };
    let mut viewer = Viewer::new("v", config, Box::new(transport.clone())).unwrap();
    viewer.on_ready(&mut c).unwrap();

    let payloads = transport.payloads().unwrap();
    assert!(payloads[0].starts_with("img_background = new Image(100, 100);\nimg_background.src = '/static/plan.png';"));
    viewer.refresh(&mut c, 0.0).unwrap();
    let frame = transport.payloads().unwrap().pop().unwrap();
    assert!(frame.contains("draw_image(ctx_drawing,img_background,0,0,10,10,'opacity(0.2)');"));
}

#[test]
fn invalid_config_is_rejected() {
    let config = ViewerConfig {
        working_surface: String::new(),
        ..ViewerConfig::default()
    };
    let transport = RecordingTransport::new(Size::new(1.0, 1.0));
    assert!(matches!(
        Viewer::new("v", config, Box::new(transport)),
        Err(LiveCanvasError::Config(_))
    ));
}
