use std::sync::{Arc, Mutex};

use kurbo::{Point, Size};

use crate::foundation::error::{LiveCanvasError, LiveCanvasResult};

/// Last known pointer state on a surface.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PointerState {
    /// Position in scene (world) coordinates, used for hit-testing.
    pub world: Point,
    /// Position in page coordinates, used to place the tooltip.
    pub page: Point,
    /// Milliseconds since the pointer last moved.
    pub elapsed_ms: f64,
}

/// Text panels a viewer can show next to the drawing surface.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub enum Panel {
    /// Hover tooltip anchored at a page position.
    Tooltip { at: Point },
    /// Property view for the last clicked selection.
    Properties,
    /// Data-source freshness lines.
    SourceStatus,
}

/// Connection to one remote drawing surface.
///
/// Implementations execute each payload atomically against their working/display surface
/// pair.
pub trait SurfaceTransport: Send {
    /// Execute one command-batch payload.
    fn submit(&mut self, payload: &str) -> LiveCanvasResult<()>;

    /// Geometry of the working surface.
    fn surface_size(&mut self) -> LiveCanvasResult<Size>;

    /// Pointer state, `None` before the pointer ever entered the surface.
    fn pointer(&mut self) -> LiveCanvasResult<Option<PointerState>>;

    /// Show `text` on `panel`, or hide the panel when `text` is `None`.
    fn present(&mut self, _panel: Panel, _text: Option<&str>) -> LiveCanvasResult<()> {
        Ok(())
    }
}

/// Everything a [`RecordingTransport`] has seen.
#[derive(Clone, Debug, Default)]
pub struct Recording {
    pub payloads: Vec<String>,
    pub presented: Vec<(Panel, Option<String>)>,
    pub size: Size,
    pub pointer: Option<PointerState>,
    /// When set, the next `submit` fails with this message.
    pub fail_next_submit: Option<String>,
}

/// In-memory transport that records payloads, for headless sessions and tests.
///
/// Clones share the same recording, so a handle kept outside a viewer observes what the
/// viewer sends.
#[derive(Clone, Debug, Default)]
pub struct RecordingTransport {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingTransport {
    pub fn new(size: Size) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Recording {
                size,
                ..Recording::default()
            })),
        }
    }

    /// Inspect or mutate the shared recording.
    pub fn with<R>(&self, f: impl FnOnce(&mut Recording) -> R) -> LiveCanvasResult<R> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| LiveCanvasError::poisoned("recording"))?;
        Ok(f(&mut guard))
    }

    /// Move the simulated pointer.
    pub fn set_pointer(&self, pointer: Option<PointerState>) -> LiveCanvasResult<()> {
        self.with(|r| r.pointer = pointer)
    }

    /// Payloads submitted so far.
    pub fn payloads(&self) -> LiveCanvasResult<Vec<String>> {
        self.with(|r| r.payloads.clone())
    }

    /// Most recent text shown on panels matching `pred`.
    pub fn last_presented(
        &self,
        pred: impl Fn(&Panel) -> bool,
    ) -> LiveCanvasResult<Option<Option<String>>> {
        self.with(|r| {
            r.presented
                .iter()
                .rev()
                .find(|(p, _)| pred(p))
                .map(|(_, t)| t.clone())
        })
    }
}

impl SurfaceTransport for RecordingTransport {
    fn submit(&mut self, payload: &str) -> LiveCanvasResult<()> {
        self.with(|r| match r.fail_next_submit.take() {
            Some(msg) => Err(LiveCanvasError::transport(msg)),
            None => {
                r.payloads.push(payload.to_string());
                Ok(())
            }
        })?
    }

    fn surface_size(&mut self) -> LiveCanvasResult<Size> {
        self.with(|r| r.size)
    }

    fn pointer(&mut self) -> LiveCanvasResult<Option<PointerState>> {
        self.with(|r| r.pointer)
    }

    fn present(&mut self, panel: Panel, text: Option<&str>) -> LiveCanvasResult<()> {
        self.with(|r| r.presented.push((panel, text.map(str::to_string))))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/draw/transport.rs"]
mod tests;
