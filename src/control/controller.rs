use std::collections::{BTreeMap, BTreeSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::control::executor::{FetchExecutor, PendingFetch, PoolExecutor, panic_message};
use crate::data::dataset::{Dataset, merge_views};
use crate::data::renderer::{LayerRenderer, OptionValues, RendererOption};
use crate::data::source::{DataSource, SourceStatus};
use crate::foundation::core::{Seconds, now_secs};
use crate::foundation::error::{LiveCanvasError, LiveCanvasResult};
use crate::scene::tree::{HitSelection, NodeId, Scene};

/// Scheduler settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Lower bound applied to every source's cooldown, in seconds.
    pub minimum_cooldown: Seconds,
    /// Pause between scheduler ticks, in seconds.
    pub tick_interval: Seconds,
    /// Source whose row identifiers define every merged view.
    pub coordinate_source: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            minimum_cooldown: 5.0,
            tick_interval: 1.0,
            coordinate_source: "data_coords".to_string(),
        }
    }
}

impl ControllerConfig {
    pub fn from_json_str(s: &str) -> LiveCanvasResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| LiveCanvasError::config(format!("invalid controller config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> LiveCanvasResult<()> {
        if !self.minimum_cooldown.is_finite() || self.minimum_cooldown < 0.0 {
            return Err(LiveCanvasError::config(
                "minimum_cooldown must be finite and >= 0",
            ));
        }
        check_interval("tick_interval", self.tick_interval)?;
        if self.coordinate_source.trim().is_empty() {
            return Err(LiveCanvasError::config("coordinate_source must be non-empty"));
        }
        Ok(())
    }
}

pub(crate) fn check_interval(what: &str, secs: Seconds) -> LiveCanvasResult<()> {
    if secs.is_finite() && secs > 0.0 {
        Ok(())
    } else {
        Err(LiveCanvasError::config(format!(
            "{what} must be finite and > 0, got {secs}"
        )))
    }
}

/// What one scheduler tick did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Sources whose fetch was dispatched.
    pub dispatched: Vec<String>,
    /// Sources whose fetch completed with data.
    pub completed: Vec<String>,
    /// Sources whose fetch failed; their data is unchanged.
    pub failed: Vec<String>,
    /// Renderers whose recompute step ran and succeeded.
    pub recomputed: Vec<String>,
    /// Renderers whose recompute step failed.
    pub recompute_failed: Vec<String>,
}

struct RendererSlot {
    renderer: Box<dyn LayerRenderer>,
    view: Dataset,
    visible: bool,
}

/// Registry of data sources and renderers, plus the scheduler bookkeeping that connects them.
///
/// Only the scheduler tick mutates sources and in-flight fetches; workers hand back results
/// through [`PendingFetch`] handles.
pub struct Controller {
    config: ControllerConfig,
    sources: BTreeMap<String, DataSource>,
    renderers: BTreeMap<String, RendererSlot>,
    in_flight: BTreeMap<String, PendingFetch>,
    pending_dirty: BTreeSet<String>,
    executor: Box<dyn FetchExecutor>,
    warned: BTreeSet<(String, String)>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("config", &self.config)
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .field("renderers", &self.renderers.keys().collect::<Vec<_>>())
            .field("in_flight", &self.in_flight.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Controller {
    /// Controller whose fetches run on a rayon pool.
    pub fn new(config: ControllerConfig) -> LiveCanvasResult<Self> {
        Self::with_executor(config, Box::new(PoolExecutor::new(1)?))
    }

    pub fn with_executor(
        config: ControllerConfig,
        executor: Box<dyn FetchExecutor>,
    ) -> LiveCanvasResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sources: BTreeMap::new(),
            renderers: BTreeMap::new(),
            in_flight: BTreeMap::new(),
            pending_dirty: BTreeSet::new(),
            executor,
            warned: BTreeSet::new(),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Add a source; names are unique across the registry.
    pub fn register_source(&mut self, source: DataSource) -> LiveCanvasResult<()> {
        if self.sources.contains_key(source.name()) {
            return Err(LiveCanvasError::validation(format!(
                "data source '{}' is already registered",
                source.name()
            )));
        }
        tracing::debug!(source = source.name(), "registered data source");
        self.sources.insert(source.name().to_string(), source);
        self.executor.resize(self.sources.len())
    }

    /// Add a renderer; names are unique across the registry.
    ///
    /// Its merged view is built from whatever data is already installed, and it is
    /// recomputed on the next tick.
    pub fn register_renderer(&mut self, renderer: Box<dyn LayerRenderer>) -> LiveCanvasResult<()> {
        let name = renderer.name().to_string();
        if self.renderers.contains_key(&name) {
            return Err(LiveCanvasError::validation(format!(
                "renderer '{name}' is already registered"
            )));
        }
        let subscriptions = renderer.subscriptions().to_vec();
        self.renderers.insert(
            name.clone(),
            RendererSlot {
                renderer,
                view: Dataset::new(),
                visible: true,
            },
        );
        self.check_subscriptions(&name, &subscriptions);
        let view = self.merged_view(&name, &subscriptions);
        if let Some(slot) = self.renderers.get_mut(&name) {
            slot.view = view;
        }
        self.pending_dirty.insert(name);
        Ok(())
    }

    pub fn source(&self, name: &str) -> Option<&DataSource> {
        self.sources.get(name)
    }

    pub fn sources(&self) -> impl Iterator<Item = &DataSource> {
        self.sources.values()
    }

    pub fn renderer_names(&self) -> impl Iterator<Item = &str> {
        self.renderers.keys().map(String::as_str)
    }

    /// Current merged view of a renderer.
    pub fn renderer_view(&self, name: &str) -> Option<&Dataset> {
        self.renderers.get(name).map(|s| &s.view)
    }

    /// Sources with a fetch in flight.
    pub fn in_flight(&self) -> impl Iterator<Item = &str> {
        self.in_flight.keys().map(String::as_str)
    }

    /// Install data directly; subscribers recompute on the next tick.
    pub fn set_source_data(&mut self, name: &str, data: Dataset, at: Seconds) -> LiveCanvasResult<()> {
        let source = self
            .sources
            .get_mut(name)
            .ok_or_else(|| LiveCanvasError::validation(format!("unknown data source '{name}'")))?;
        source.set_data(data, at);
        let subscribers = self.subscribers_of(name);
        self.pending_dirty.extend(subscribers);
        Ok(())
    }

    pub fn set_renderer_visible(&mut self, name: &str, visible: bool) -> LiveCanvasResult<()> {
        let slot = self
            .renderers
            .get_mut(name)
            .ok_or_else(|| LiveCanvasError::validation(format!("unknown renderer '{name}'")))?;
        slot.visible = visible;
        Ok(())
    }

    /// One scheduler step at `now`: dispatch due fetches, collect completions, recompute
    /// every dirty renderer once.
    #[tracing::instrument(level = "debug", skip(self), fields(in_flight = self.in_flight.len()))]
    pub fn tick(&mut self, now: Seconds) -> TickReport {
        let mut report = TickReport::default();

        for (name, source) in self.sources.iter_mut() {
            if self.in_flight.contains_key(name) || !source.is_due(now) {
                continue;
            }
            let Some(fetch) = source.fetcher() else {
                continue;
            };
            source.mark_dispatched();
            tracing::debug!(source = %name, "dispatching fetch");
            self.in_flight
                .insert(name.clone(), self.executor.dispatch(name, fetch));
            report.dispatched.push(name.clone());
        }

        let mut dirty = std::mem::take(&mut self.pending_dirty);
        let waiting: Vec<String> = self.in_flight.keys().cloned().collect();
        for name in waiting {
            let Some(outcome) = self.in_flight.get(&name).and_then(PendingFetch::try_take) else {
                continue;
            };
            self.in_flight.remove(&name);
            let Some(source) = self.sources.get_mut(&name) else {
                continue;
            };
            match outcome {
                Ok(data) => {
                    tracing::info!(source = %name, rows = data.len(), "data ready");
                    source.set_data(data, now);
                    source.reschedule(now, self.config.minimum_cooldown);
                    report.completed.push(name.clone());
                    dirty.extend(self.subscribers_of(&name));
                }
                Err(e) => {
                    tracing::error!(source = %name, error = %e, "fetch failed");
                    source.reschedule(now, self.config.minimum_cooldown);
                    report.failed.push(name.clone());
                }
            }
        }

        for name in dirty {
            match self.recompute(&name) {
                Ok(()) => report.recomputed.push(name),
                Err(e) => {
                    tracing::error!(renderer = %name, error = %e, "recompute failed");
                    report.recompute_failed.push(name);
                }
            }
        }
        report
    }

    /// Rebuild one renderer's merged view and run its data-changed step.
    pub fn recompute(&mut self, name: &str) -> LiveCanvasResult<()> {
        let subscriptions = self
            .renderers
            .get(name)
            .map(|s| s.renderer.subscriptions().to_vec())
            .ok_or_else(|| LiveCanvasError::validation(format!("unknown renderer '{name}'")))?;
        let view = self.merged_view(name, &subscriptions);
        let slot = self
            .renderers
            .get_mut(name)
            .ok_or_else(|| LiveCanvasError::validation(format!("unknown renderer '{name}'")))?;
        slot.view = view;
        let RendererSlot { renderer, view, .. } = slot;
        guarded(name, || renderer.on_data_changed(view))
    }

    /// Build each renderer's nodes under `parent` in a freshly prepared scene.
    pub fn init_layers(&mut self, scene: &mut Scene, parent: NodeId) -> Vec<LiveCanvasError> {
        let mut failures = Vec::new();
        for (name, slot) in self.renderers.iter_mut() {
            let RendererSlot { renderer, view, .. } = slot;
            if let Err(e) = guarded(name, || renderer.layer_init(scene, parent, view)) {
                tracing::error!(renderer = %name, error = %e, "layer init failed");
                failures.push(e);
            }
        }
        failures
    }

    /// Push every renderer's latest properties onto the nodes under `parent`.
    ///
    /// Nodes of a hidden renderer are hidden and its render step is skipped. Showing the
    /// renderer again reveals its nodes once; after that the renderer owns their visibility.
    pub fn render_layers(
        &mut self,
        scene: &mut Scene,
        parent: NodeId,
        options: &OptionValues,
    ) -> Vec<LiveCanvasError> {
        let mut failures = Vec::new();
        for (name, slot) in self.renderers.iter_mut() {
            let toggled = scene.set_layer_hidden(name, !slot.visible);
            if toggled || !slot.visible {
                for id in scene.descendants(parent) {
                    if let Ok(obj) = scene.get_mut(id)
                        && obj.props.layer.as_deref() == Some(name.as_str())
                    {
                        obj.props.visible = slot.visible;
                    }
                }
            }
            if !slot.visible {
                continue;
            }
            let RendererSlot { renderer, view, .. } = slot;
            if let Err(e) = guarded(name, || renderer.render(scene, parent, view, options)) {
                tracing::error!(renderer = %name, error = %e, "layer render failed");
                failures.push(e);
            }
        }
        failures
    }

    /// Every declared option, first declaration of an id wins.
    pub fn collect_options(&self) -> Vec<RendererOption> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for slot in self.renderers.values() {
            for opt in slot.renderer.options() {
                if seen.insert(opt.id.clone()) {
                    out.push(opt);
                }
            }
        }
        out
    }

    pub fn default_option_values(&self) -> OptionValues {
        self.collect_options()
            .into_iter()
            .map(|o| (o.id, o.default))
            .collect()
    }

    pub fn source_status(&self, now: Seconds) -> Vec<SourceStatus> {
        self.sources.values().map(|s| s.status(now)).collect()
    }

    /// Concatenated tooltip text of the named layers for `row_id`.
    ///
    /// A renderer whose tooltip fails contributes its error text instead.
    pub fn tooltip(&self, layer_names: &BTreeSet<String>, row_id: Option<&str>) -> String {
        let mut out = String::new();
        for name in layer_names {
            let Some(slot) = self.renderers.get(name) else {
                continue;
            };
            match slot.renderer.tooltip(&slot.view, row_id) {
                Ok(text) => out.push_str(&text),
                Err(e) => {
                    tracing::warn!(renderer = %name, error = %e, "tooltip failed");
                    out.push_str(&format!("{e:#}\n"));
                }
            }
        }
        out
    }

    pub fn tooltip_for(&self, selection: &HitSelection) -> String {
        self.tooltip(&selection.layer_names, selection.row_id.as_deref())
    }

    /// Drive `tick` until `shutdown` is set, pausing `tick_interval` between ticks.
    ///
    /// In-flight fetches are not cancelled; their results are dropped with the controller.
    pub fn run(controller: &Arc<Mutex<Self>>, shutdown: &AtomicBool) -> LiveCanvasResult<()> {
        tracing::info!("scheduler started");
        while !shutdown.load(Ordering::Acquire) {
            let interval = {
                let mut c = controller
                    .lock()
                    .map_err(|_| LiveCanvasError::poisoned("controller"))?;
                let report = c.tick(now_secs());
                if !report.completed.is_empty() || !report.failed.is_empty() {
                    tracing::debug!(?report, "tick");
                }
                c.config.tick_interval
            };
            pause_for(interval, shutdown);
        }
        tracing::info!("scheduler stopped");
        Ok(())
    }

    fn subscribers_of(&self, source: &str) -> Vec<String> {
        self.renderers
            .iter()
            .filter(|(_, s)| s.renderer.subscriptions().iter().any(|n| n == source))
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn check_subscriptions(&mut self, renderer: &str, subscriptions: &[String]) {
        for source in subscriptions {
            if !self.sources.contains_key(source) {
                self.warn_malformed(renderer, source);
            }
        }
    }

    fn warn_malformed(&mut self, renderer: &str, source: &str) {
        if self
            .warned
            .insert((renderer.to_string(), source.to_string()))
        {
            let e = LiveCanvasError::MalformedSubscription {
                renderer: renderer.to_string(),
                source_name: source.to_string(),
            };
            tracing::warn!(error = %e, "merged view will lack this source");
        }
    }

    fn merged_view(&mut self, renderer: &str, subscriptions: &[String]) -> Dataset {
        let coords = self.config.coordinate_source.clone();
        let Some(domain) = self.sources.get(&coords) else {
            self.warn_malformed(renderer, &coords);
            return Dataset::new();
        };
        let mut missing = Vec::new();
        let mut parts = Vec::new();
        for name in subscriptions {
            match self.sources.get(name) {
                Some(s) => parts.push(s.data()),
                None => missing.push(name.clone()),
            }
        }
        let view = merge_views(domain.data(), parts);
        for name in missing {
            self.warn_malformed(renderer, &name);
        }
        view
    }
}

/// Run renderer code, turning errors and panics into a recompute failure for `renderer`.
fn guarded<T>(renderer: &str, f: impl FnOnce() -> anyhow::Result<T>) -> LiveCanvasResult<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(LiveCanvasError::recompute(renderer, format!("{e:#}"))),
        Err(panic) => Err(LiveCanvasError::recompute(
            renderer,
            format!("panicked: {}", panic_message(panic.as_ref())),
        )),
    }
}

/// Sleep for `secs`, waking early once `shutdown` is set.
pub(crate) fn pause_for(secs: Seconds, shutdown: &AtomicBool) {
    const SLICE: Duration = Duration::from_millis(50);
    let total = Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO);
    let deadline = Instant::now() + total;
    while !shutdown.load(Ordering::Acquire) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep(SLICE.min(deadline - now));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/control/controller.rs"]
mod tests;
