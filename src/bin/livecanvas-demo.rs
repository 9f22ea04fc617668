use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use kurbo::{Point, Size};
use livecanvas::{
    Controller, Coords, DataSource, Dataset, Engine, EngineConfig, FlightPlan, GlowSpec,
    LayerRenderer, NodeId, OptionValues, PointerState, RecordingTransport, RenderObject,
    RendererOption, Rgba, Scene, StyleKey, Trajectory,
};

/// Run a headless session against an in-memory surface and report what was drawn.
#[derive(Parser, Debug)]
#[command(name = "livecanvas-demo", version)]
struct Cli {
    /// Engine config JSON; defaults apply to missing fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds to keep the session running.
    #[arg(long, default_value_t = 3.0)]
    seconds: f64,

    /// Number of synthetic points laid out on a grid.
    #[arg(long, default_value_t = 12)]
    points: usize,

    /// Log at debug level.
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => EngineConfig {
            refresh_interval: 0.1,
            ..EngineConfig::default()
        },
    };

    let mut controller = Controller::new(config.controller.clone())?;
    controller.register_source(DataSource::manual(
        config.controller.coordinate_source.clone(),
        grid(cli.points),
    ))?;
    controller.register_source(values_source(cli.points).with_cooldown(1.0))?;
    controller.register_source(open_source(cli.points).with_cooldown(2.0))?;
    controller.register_renderer(Box::new(ValueDots::new(&config.controller.coordinate_source)))?;
    controller.register_renderer(Box::new(OpenHalo::new(&config.controller.coordinate_source)))?;

    let mut engine = Engine::new(config, controller)?;
    let surface = RecordingTransport::new(Size::new(640.0, 480.0));
    engine.add_viewer("demo", Box::new(surface.clone()))?;
    surface.set_pointer(Some(PointerState {
        world: Point::new(60.0, 60.0),
        page: Point::new(60.0, 60.0),
        elapsed_ms: 1000.0,
    }))?;

    engine.start()?;
    std::thread::sleep(Duration::try_from_secs_f64(cli.seconds.max(0.0)).unwrap_or_default());
    engine.pointer_up("demo", 0)?;
    engine.shutdown();
    engine.join()?;

    let recording = surface.with(|r| r.clone())?;
    let bytes: usize = recording.payloads.iter().map(String::len).sum();
    tracing::info!(
        frames = recording.payloads.len(),
        bytes,
        panels = recording.presented.len(),
        "session finished"
    );
    for (panel, text) in recording.presented.iter().rev().take(3) {
        println!("{panel:?}: {}", text.as_deref().unwrap_or("<hidden>"));
    }
    Ok(())
}

fn grid(points: usize) -> Dataset {
    let mut ds = Dataset::new();
    for i in 0..points {
        let id = format!("P{i}");
        ds.set(id.as_str(), "x", 60.0 + 100.0 * (i % 6) as f64);
        ds.set(id.as_str(), "y", 60.0 + 100.0 * (i / 6) as f64);
    }
    ds
}

fn values_source(points: usize) -> DataSource {
    let round = Arc::new(AtomicU64::new(0));
    DataSource::new("values", move || -> anyhow::Result<Dataset> {
        let r = round.fetch_add(1, Ordering::Relaxed);
        let mut ds = Dataset::new();
        for i in 0..points {
            let phase = (r as f64 + i as f64) * 0.7;
            ds.set(format!("P{i}"), "value", 50.0 + 50.0 * phase.sin());
        }
        Ok(ds)
    })
}

fn open_source(points: usize) -> DataSource {
    let round = Arc::new(AtomicU64::new(0));
    DataSource::new("open", move || -> anyhow::Result<Dataset> {
        let r = round.fetch_add(1, Ordering::Relaxed) as usize;
        let mut ds = Dataset::new();
        for i in 0..points {
            ds.set(format!("P{i}"), "open", (i + r) % 3 == 0);
        }
        Ok(ds)
    })
}

/// One circle per point, sized and shaded by its value.
struct ValueDots {
    subscriptions: Vec<String>,
}

impl ValueDots {
    fn new(coords: &str) -> Self {
        Self {
            subscriptions: vec![coords.to_string(), "values".to_string()],
        }
    }
}

impl LayerRenderer for ValueDots {
    fn name(&self) -> &str {
        "values"
    }

    fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    fn options(&self) -> Vec<RendererOption> {
        vec![RendererOption::flag("show_values", "Show values", true)]
    }

    fn render(
        &mut self,
        scene: &mut Scene,
        parent: NodeId,
        view: &Dataset,
        options: &OptionValues,
    ) -> anyhow::Result<()> {
        for (id, _) in view.iter() {
            let (x, y) = (
                view.number(id, "x").unwrap_or_default(),
                view.number(id, "y").unwrap_or_default(),
            );
            let node = match scene.child_named(parent, id) {
                Some(node) => node,
                None => {
                    // value dots drift around their anchor
                    let mut drift = FlightPlan::new(Trajectory::orbit(
                        Point::new(x, y),
                        Coords::xy(0.0, 6.0),
                        Coords::xy(90.0, 0.0),
                    ));
                    drift.start_forward(None);
                    let dot = RenderObject::circle(id, x, y, 4.0)
                        .with_flight(drift)
                        .with_layer("values")
                        .with_row(id);
                    scene.add_child(parent, dot)?
                }
            };
            let value = view.number(id, "value").unwrap_or_default();
            let dot = scene.get_mut(node)?;
            dot.set_radius(4.0 + value / 5.0);
            dot.set_style("fillStyle", Rgba::new(255.0, 255.0 - 2.0 * value, 0.0, 0.8))?;
            dot.props.visible = options.flag("show_values");
        }
        Ok(())
    }

    fn tooltip(&self, view: &Dataset, row_id: Option<&str>) -> anyhow::Result<String> {
        let Some(id) = row_id else {
            return Ok(String::new());
        };
        let value = view
            .number(id, "value")
            .with_context(|| format!("no value for {id}"))?;
        Ok(format!("{id}: value {value:.1}\n"))
    }
}

/// Glowing ring around points whose `open` flag is set.
struct OpenHalo {
    subscriptions: Vec<String>,
}

impl OpenHalo {
    fn new(coords: &str) -> Self {
        Self {
            subscriptions: vec![coords.to_string(), "open".to_string()],
        }
    }
}

impl LayerRenderer for OpenHalo {
    fn name(&self) -> &str {
        "open"
    }

    fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    fn layer_init(&mut self, scene: &mut Scene, parent: NodeId, view: &Dataset) -> anyhow::Result<()> {
        for (id, _) in view.iter() {
            let x = view.number(id, "x").unwrap_or_default();
            let y = view.number(id, "y").unwrap_or_default();
            let ring = RenderObject::circle(format!("halo-{id}"), x, y, 30.0)
                .without_fill()
                .with_style(StyleKey::StrokeStyle, Rgba::new(0.0, 160.0, 255.0, 1.0))
                .with_glow(GlowSpec {
                    enabled: true,
                    width: 8,
                    ..GlowSpec::default()
                })
                .with_layer("open")
                .with_row(id)
                .with_visible(false);
            scene.add_child(parent, ring)?;
        }
        Ok(())
    }

    fn render(
        &mut self,
        scene: &mut Scene,
        parent: NodeId,
        view: &Dataset,
        _options: &OptionValues,
    ) -> anyhow::Result<()> {
        for (id, row) in view.iter() {
            let open = row
                .get("open")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            if let Some(node) = scene.child_named(parent, &format!("halo-{id}")) {
                scene.get_mut(node)?.props.visible = open;
            }
        }
        Ok(())
    }

    fn tooltip(&self, view: &Dataset, row_id: Option<&str>) -> anyhow::Result<String> {
        let open = row_id
            .and_then(|id| view.value(id, "open"))
            .and_then(serde_json::Value::as_bool);
        Ok(match open {
            Some(true) => "open\n".to_string(),
            Some(false) => "closed\n".to_string(),
            None => String::new(),
        })
    }
}
