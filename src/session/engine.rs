use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use crate::control::controller::{Controller, ControllerConfig, check_interval, pause_for};
use crate::control::executor::panic_message;
use crate::data::renderer::OptionValues;
use crate::draw::transport::SurfaceTransport;
use crate::foundation::core::{Seconds, now_secs};
use crate::foundation::error::{LiveCanvasError, LiveCanvasResult};
use crate::session::viewer::{Viewer, ViewerConfig};

/// Session settings: scheduler, viewers, and the pace of the viewer loops.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub controller: ControllerConfig,
    pub viewer: ViewerConfig,
    /// Seconds between frame refreshes.
    pub refresh_interval: Seconds,
    /// Seconds between hover checks.
    pub tooltip_interval: Seconds,
    /// Seconds between property panel refreshes.
    pub property_interval: Seconds,
    /// Seconds between source status refreshes.
    pub status_interval: Seconds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            viewer: ViewerConfig::default(),
            refresh_interval: 0.1,
            tooltip_interval: 0.1,
            property_interval: 1.0,
            status_interval: 1.0,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(s: &str) -> LiveCanvasResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| LiveCanvasError::config(format!("invalid engine config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> LiveCanvasResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| LiveCanvasError::config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> LiveCanvasResult<()> {
        self.controller.validate()?;
        self.viewer.validate()?;
        check_interval("refresh_interval", self.refresh_interval)?;
        check_interval("tooltip_interval", self.tooltip_interval)?;
        check_interval("property_interval", self.property_interval)?;
        check_interval("status_interval", self.status_interval)
    }
}

/// State shared by the engine loops. Locks are always taken controller first.
struct Shared {
    config: EngineConfig,
    controller: Arc<Mutex<Controller>>,
    viewers: Mutex<Vec<Viewer>>,
    shutdown: Arc<AtomicBool>,
}

impl Shared {
    fn lock_controller(&self) -> LiveCanvasResult<MutexGuard<'_, Controller>> {
        self.controller
            .lock()
            .map_err(|_| LiveCanvasError::poisoned("controller"))
    }

    fn lock_viewers(&self) -> LiveCanvasResult<MutexGuard<'_, Vec<Viewer>>> {
        self.viewers
            .lock()
            .map_err(|_| LiveCanvasError::poisoned("viewers"))
    }

    fn refresh_all(&self, t: Seconds) -> LiveCanvasResult<usize> {
        let mut controller = self.lock_controller()?;
        let mut viewers = self.lock_viewers()?;
        let mut failed = 0;
        for viewer in viewers.iter_mut() {
            // a panicking trajectory handler must not poison the shared locks
            let outcome = catch_unwind(AssertUnwindSafe(|| viewer.refresh(&mut controller, t)))
                .unwrap_or_else(|panic| {
                    Err(LiveCanvasError::Other(anyhow::anyhow!(
                        "refresh panicked: {}",
                        panic_message(panic.as_ref())
                    )))
                });
            if let Err(e) = outcome {
                tracing::error!(viewer = viewer.name(), error = %e, "refresh failed, retrying next tick");
                failed += 1;
            }
        }
        Ok(failed)
    }

    fn panels_all(&self, t: Seconds, properties: bool, status: bool) -> LiveCanvasResult<usize> {
        let controller = self.lock_controller()?;
        let mut viewers = self.lock_viewers()?;
        let mut failed = 0;
        for viewer in viewers.iter_mut() {
            let mut outcome = viewer.check_hover(&controller, t).map(|_| ());
            if properties {
                outcome = outcome.and_then(|()| viewer.refresh_properties(&controller));
            }
            if status {
                outcome = outcome.and_then(|()| viewer.refresh_status(&controller, t));
            }
            if let Err(e) = outcome {
                tracing::warn!(viewer = viewer.name(), error = %e, "panel update failed");
                failed += 1;
            }
        }
        Ok(failed)
    }

    fn refresh_loop(&self) -> LiveCanvasResult<()> {
        while !self.shutdown.load(Ordering::Acquire) {
            self.refresh_all(now_secs())?;
            pause_for(self.config.refresh_interval, &self.shutdown);
        }
        Ok(())
    }

    fn panel_loop(&self) -> LiveCanvasResult<()> {
        let mut last_properties = 0.0;
        let mut last_status = 0.0;
        while !self.shutdown.load(Ordering::Acquire) {
            let t = now_secs();
            let properties = t - last_properties >= self.config.property_interval;
            let status = t - last_status >= self.config.status_interval;
            self.panels_all(t, properties, status)?;
            if properties {
                last_properties = t;
            }
            if status {
                last_status = t;
            }
            pause_for(self.config.tooltip_interval, &self.shutdown);
        }
        Ok(())
    }
}

/// A running session: one controller, any number of viewers, and the three loops driving
/// them (scheduler, frame refresh, hover and panels).
pub struct Engine {
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<LiveCanvasResult<()>>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.shared.config)
            .field("threads", &self.threads.len())
            .finish()
    }
}

impl Engine {
    pub fn new(config: EngineConfig, controller: Controller) -> LiveCanvasResult<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                controller: Arc::new(Mutex::new(controller)),
                viewers: Mutex::new(Vec::new()),
                shutdown: Arc::new(AtomicBool::new(false)),
            }),
            threads: Vec::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Shared controller handle, for registrations and inspection while running.
    pub fn controller(&self) -> Arc<Mutex<Controller>> {
        Arc::clone(&self.shared.controller)
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shared.shutdown)
    }

    /// Connect a surface and build its scene.
    pub fn add_viewer(
        &self,
        name: impl Into<String>,
        transport: Box<dyn SurfaceTransport>,
    ) -> LiveCanvasResult<()> {
        let mut viewer = Viewer::new(name, self.shared.config.viewer.clone(), transport)?;
        let mut controller = self.shared.lock_controller()?;
        viewer.on_ready(&mut controller)?;
        self.shared.lock_viewers()?.push(viewer);
        Ok(())
    }

    /// Disconnect a viewer, returning whether it existed.
    pub fn remove_viewer(&self, name: &str) -> LiveCanvasResult<bool> {
        let mut viewers = self.shared.lock_viewers()?;
        let before = viewers.len();
        viewers.retain(|v| v.name() != name);
        Ok(viewers.len() != before)
    }

    pub fn viewer_count(&self) -> LiveCanvasResult<usize> {
        Ok(self.shared.lock_viewers()?.len())
    }

    /// Forward a pointer release to the named viewer.
    pub fn pointer_up(&self, viewer: &str, button: u16) -> LiveCanvasResult<()> {
        let controller = self.shared.lock_controller()?;
        let mut viewers = self.shared.lock_viewers()?;
        let v = viewers
            .iter_mut()
            .find(|v| v.name() == viewer)
            .ok_or_else(|| unknown_viewer(viewer))?;
        v.on_pointer_up(&controller, button, now_secs())
    }

    /// Current option values of the named viewer.
    pub fn options(&self, viewer: &str) -> LiveCanvasResult<OptionValues> {
        let viewers = self.shared.lock_viewers()?;
        let v = viewers
            .iter()
            .find(|v| v.name() == viewer)
            .ok_or_else(|| unknown_viewer(viewer))?;
        Ok(v.options().clone())
    }

    /// Replace the option values of the named viewer; renderers see them on its next refresh.
    pub fn set_options(&self, viewer: &str, values: OptionValues) -> LiveCanvasResult<()> {
        let mut viewers = self.shared.lock_viewers()?;
        let v = viewers
            .iter_mut()
            .find(|v| v.name() == viewer)
            .ok_or_else(|| unknown_viewer(viewer))?;
        v.set_options(values);
        tracing::debug!(viewer, "options updated");
        Ok(())
    }

    /// Refresh every viewer once, returning how many failed.
    pub fn refresh_viewers(&self, t: Seconds) -> LiveCanvasResult<usize> {
        self.shared.refresh_all(t)
    }

    /// Run hover checks and both panel refreshes once, returning how many viewers failed.
    pub fn update_panels(&self, t: Seconds) -> LiveCanvasResult<usize> {
        self.shared.panels_all(t, true, true)
    }

    /// Spawn the scheduler, refresh, and hover threads.
    pub fn start(&mut self) -> LiveCanvasResult<()> {
        if !self.threads.is_empty() {
            return Err(LiveCanvasError::validation("engine already started"));
        }
        self.shared.shutdown.store(false, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        self.spawn("livecanvas-scheduler", move || {
            Controller::run(&shared.controller, &shared.shutdown)
        })?;
        let shared = Arc::clone(&self.shared);
        self.spawn("livecanvas-refresh", move || shared.refresh_loop())?;
        let shared = Arc::clone(&self.shared);
        self.spawn("livecanvas-hover", move || shared.panel_loop())?;

        tracing::info!(threads = self.threads.len(), "engine started");
        Ok(())
    }

    /// Ask every loop to stop after its current iteration.
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
    }

    /// Wait for the loops to exit, returning the first loop error.
    pub fn join(&mut self) -> LiveCanvasResult<()> {
        let mut first = Ok(());
        for handle in self.threads.drain(..) {
            let name = handle.thread().name().unwrap_or("livecanvas").to_string();
            let outcome = handle.join().unwrap_or_else(|_| {
                Err(LiveCanvasError::validation(format!("{name} thread panicked")))
            });
            if let Err(e) = outcome {
                tracing::error!(thread = %name, error = %e, "loop exited with error");
                if first.is_ok() {
                    first = Err(e);
                }
            }
        }
        tracing::info!("engine stopped");
        first
    }

    fn spawn(
        &mut self,
        name: &str,
        body: impl FnOnce() -> LiveCanvasResult<()> + Send + 'static,
    ) -> LiveCanvasResult<()> {
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(body)
            .map_err(|e| LiveCanvasError::Other(e.into()))?;
        self.threads.push(handle);
        Ok(())
    }
}

fn unknown_viewer(name: &str) -> LiveCanvasError {
    LiveCanvasError::validation(format!("unknown viewer '{name}'"))
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/engine.rs"]
mod tests;
