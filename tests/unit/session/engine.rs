use super::*;
use crate::control::executor::InlineExecutor;
use crate::data::dataset::Dataset;
use crate::data::renderer::{LayerRenderer, OptionValue, RendererOption};
use crate::data::source::DataSource;
use crate::draw::transport::{Panel, RecordingTransport};
use crate::motion::bounce::{FnHandler, PlacementFrame};
use crate::motion::flight::FlightPlan;
use crate::scene::node::RenderObject;
use crate::scene::tree::{NodeId, Scene};
use kurbo::Size;
use std::time::Duration;

fn controller() -> Controller {
    let mut c = Controller::with_executor(ControllerConfig::default(), Box::new(InlineExecutor))
        .unwrap();
    let mut coords = Dataset::new();
    coords.set("P1", "x", 10.0);
    c.register_source(DataSource::manual("data_coords", coords))
        .unwrap();
    c
}

fn fast_config() -> EngineConfig {
    EngineConfig {
        controller: ControllerConfig {
            tick_interval: 0.05,
            ..ControllerConfig::default()
        },
        refresh_interval: 0.02,
        tooltip_interval: 0.02,
        property_interval: 0.05,
        status_interval: 0.05,
        ..EngineConfig::default()
    }
}

#[test]
fn config_defaults_and_validation() {
    let cfg = EngineConfig::from_json_str(r#"{"refresh_interval": 0.25}"#).unwrap();
    assert_eq!(cfg.refresh_interval, 0.25);
    assert_eq!(cfg.status_interval, 1.0);
    assert_eq!(cfg.viewer.working_surface, "ctx_drawing");

    for bad in [
        r#"{"tooltip_interval": 0}"#,
        r#"{"controller": {"tick_interval": -1}}"#,
        r#"{"viewer": {"display_surface": ""}}"#,
    ] {
        assert!(matches!(
            EngineConfig::from_json_str(bad),
            Err(LiveCanvasError::Config(_))
        ));
    }
    assert!(EngineConfig::from_json_file("/nonexistent/livecanvas.json").is_err());
}

#[test]
fn failed_refresh_is_isolated_and_retried() {
    let engine = Engine::new(EngineConfig::default(), controller()).unwrap();
    let flaky = RecordingTransport::new(Size::new(50.0, 50.0));
    let steady = RecordingTransport::new(Size::new(50.0, 50.0));
    engine.add_viewer("flaky", Box::new(flaky.clone())).unwrap();
    engine.add_viewer("steady", Box::new(steady.clone())).unwrap();
    assert_eq!(engine.viewer_count().unwrap(), 2);

    flaky
        .with(|r| r.fail_next_submit = Some("socket closed".to_string()))
        .unwrap();
    assert_eq!(engine.refresh_viewers(0.0).unwrap(), 1);
    assert!(flaky.payloads().unwrap().is_empty());
    assert_eq!(steady.payloads().unwrap().len(), 1);

    assert_eq!(engine.refresh_viewers(0.1).unwrap(), 0);
    assert_eq!(flaky.payloads().unwrap().len(), 1);
    assert_eq!(steady.payloads().unwrap().len(), 2);
}

#[test]
fn panels_and_pointer_routing() {
    let engine = Engine::new(EngineConfig::default(), controller()).unwrap();
    let transport = RecordingTransport::new(Size::new(50.0, 50.0));
    engine.add_viewer("v", Box::new(transport.clone())).unwrap();

    assert_eq!(engine.update_panels(0.0).unwrap(), 0);
    let status = transport
        .last_presented(|p| *p == Panel::SourceStatus)
        .unwrap();
    assert_eq!(status, Some(Some("data_coords: never fetched".to_string())));

    assert!(engine.pointer_up("v", 0).is_ok());
    assert!(matches!(
        engine.pointer_up("ghost", 0),
        Err(LiveCanvasError::Validation(_))
    ));

    assert!(engine.remove_viewer("v").unwrap());
    assert!(!engine.remove_viewer("v").unwrap());
    assert_eq!(engine.viewer_count().unwrap(), 0);
}

#[test]
fn loops_run_until_shutdown() {
    let mut engine = Engine::new(fast_config(), controller()).unwrap();
    let transport = RecordingTransport::new(Size::new(50.0, 50.0));
    engine.add_viewer("v", Box::new(transport.clone())).unwrap();

    engine.start().unwrap();
    assert!(engine.start().is_err());
    std::thread::sleep(Duration::from_millis(200));
    engine.shutdown();
    engine.join().unwrap();

    assert!(!transport.payloads().unwrap().is_empty());
    let status = transport
        .last_presented(|p| *p == Panel::SourceStatus)
        .unwrap();
    assert!(status.is_some());
}

#[test]
fn dropping_the_engine_raises_shutdown() {
    let engine = Engine::new(EngineConfig::default(), controller()).unwrap();
    let flag = engine.shutdown_flag();
    assert!(!flag.load(Ordering::Acquire));
    drop(engine);
    assert!(flag.load(Ordering::Acquire));
}

fn trip(_: &PlacementFrame<'_>, _: &mut FlightPlan, _: Seconds) {
    panic!("handler bug");
}

/// Places one node whose decision handler panics whenever it is drawn.
struct Tripwire;

impl LayerRenderer for Tripwire {
    fn name(&self) -> &str {
        "tripwire"
    }

    fn subscriptions(&self) -> &[String] {
        &[]
    }

    fn layer_init(&mut self, scene: &mut Scene, parent: NodeId, _view: &Dataset) -> anyhow::Result<()> {
        let flight = FlightPlan::fixed(5.0, 5.0).with_handler(Arc::new(FnHandler(trip)));
        scene.add_child(parent, RenderObject::circle("trap", 5.0, 5.0, 1.0).with_flight(flight))?;
        Ok(())
    }

    fn render(
        &mut self,
        _scene: &mut Scene,
        _parent: NodeId,
        _view: &Dataset,
        _options: &OptionValues,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

#[test]
fn panicking_handler_fails_the_refresh_without_poisoning() {
    let mut c = controller();
    c.register_renderer(Box::new(Tripwire)).unwrap();
    let engine = Engine::new(EngineConfig::default(), c).unwrap();
    let transport = RecordingTransport::new(Size::new(50.0, 50.0));
    engine.add_viewer("v", Box::new(transport.clone())).unwrap();

    assert_eq!(engine.refresh_viewers(10.0).unwrap(), 1);
    assert!(transport.payloads().unwrap().is_empty());

    assert!(engine.controller().lock().is_ok());
    assert_eq!(engine.viewer_count().unwrap(), 1);
    assert_eq!(engine.refresh_viewers(11.0).unwrap(), 1);
    assert_eq!(engine.update_panels(11.0).unwrap(), 0);
}

/// Records the `show` flag it was last rendered with.
struct FlagWatcher {
    seen: Arc<AtomicBool>,
}

impl LayerRenderer for FlagWatcher {
    fn name(&self) -> &str {
        "watcher"
    }

    fn subscriptions(&self) -> &[String] {
        &[]
    }

    fn options(&self) -> Vec<RendererOption> {
        vec![RendererOption::flag("show", "Show", true)]
    }

    fn render(
        &mut self,
        _scene: &mut Scene,
        _parent: NodeId,
        _view: &Dataset,
        options: &OptionValues,
    ) -> anyhow::Result<()> {
        self.seen.store(options.flag("show"), Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn changed_options_reach_the_renderer() {
    let seen = Arc::new(AtomicBool::new(false));
    let mut c = controller();
    c.register_renderer(Box::new(FlagWatcher { seen: seen.clone() }))
        .unwrap();
    let engine = Engine::new(EngineConfig::default(), c).unwrap();
    engine
        .add_viewer("v", Box::new(RecordingTransport::new(Size::new(50.0, 50.0))))
        .unwrap();

    assert_eq!(engine.refresh_viewers(0.0).unwrap(), 0);
    assert!(seen.load(Ordering::SeqCst));

    let mut values = engine.options("v").unwrap();
    values.set("show", OptionValue::Bool(false));
    engine.set_options("v", values.clone()).unwrap();
    assert_eq!(engine.options("v").unwrap(), values);

    assert_eq!(engine.refresh_viewers(0.1).unwrap(), 0);
    assert!(!seen.load(Ordering::SeqCst));

    assert!(matches!(
        engine.set_options("ghost", OptionValues::new()),
        Err(LiveCanvasError::Validation(_))
    ));
}
