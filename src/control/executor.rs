use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::{self, TryRecvError};

use crate::data::dataset::Dataset;
use crate::data::source::Fetch;
use crate::foundation::error::{LiveCanvasError, LiveCanvasResult};

/// Result of one fetch, as delivered to the scheduler.
pub type FetchOutcome = LiveCanvasResult<Dataset>;

/// Handle to one dispatched fetch, polled without blocking.
#[derive(Debug)]
pub struct PendingFetch {
    source: String,
    rx: mpsc::Receiver<FetchOutcome>,
}

impl PendingFetch {
    /// Handle plus the sender its worker completes.
    pub fn channel(source: impl Into<String>) -> (mpsc::Sender<FetchOutcome>, Self) {
        let (tx, rx) = mpsc::channel();
        (
            tx,
            Self {
                source: source.into(),
                rx,
            },
        )
    }

    /// Handle that is already complete.
    pub fn ready(source: impl Into<String>, outcome: FetchOutcome) -> Self {
        let (tx, pending) = Self::channel(source);
        // the receiver is alive in `pending`
        let _ = tx.send(outcome);
        pending
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Take the outcome if the fetch finished; `None` while it is still running.
    ///
    /// A worker that went away without reporting counts as a failed fetch.
    pub fn try_take(&self) -> Option<FetchOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(LiveCanvasError::fetch(
                &self.source,
                "worker exited without a result",
            ))),
        }
    }
}

/// Runs fetch implementations away from the scheduler loop.
pub trait FetchExecutor: Send {
    /// Start `fetch` for `source` and return immediately.
    fn dispatch(&mut self, source: &str, fetch: Arc<dyn Fetch>) -> PendingFetch;

    /// Adjust the worker count to the number of registered sources.
    fn resize(&mut self, _workers: usize) -> LiveCanvasResult<()> {
        Ok(())
    }
}

/// Runs each fetch to completion on the calling thread.
///
/// Completion is still observed on the next poll, so scheduling stays identical to the
/// pooled executor with instantaneous feeds.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineExecutor;

impl FetchExecutor for InlineExecutor {
    fn dispatch(&mut self, source: &str, fetch: Arc<dyn Fetch>) -> PendingFetch {
        PendingFetch::ready(source, run_fetch(source, fetch.as_ref()))
    }
}

/// Fetch workers on a dedicated rayon pool, one thread per registered source.
#[derive(Debug)]
pub struct PoolExecutor {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl PoolExecutor {
    pub fn new(workers: usize) -> LiveCanvasResult<Self> {
        let workers = workers.max(1);
        Ok(Self {
            pool: build_fetch_pool(workers)?,
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl FetchExecutor for PoolExecutor {
    fn dispatch(&mut self, source: &str, fetch: Arc<dyn Fetch>) -> PendingFetch {
        let (tx, pending) = PendingFetch::channel(source);
        let name = source.to_string();
        self.pool.spawn(move || {
            let outcome = run_fetch(&name, fetch.as_ref());
            if tx.send(outcome).is_err() {
                tracing::debug!(source = %name, "fetch result dropped, scheduler gone");
            }
        });
        pending
    }

    fn resize(&mut self, workers: usize) -> LiveCanvasResult<()> {
        let workers = workers.max(1);
        if workers != self.workers {
            // in-flight jobs finish on the old pool before it is torn down
            self.pool = build_fetch_pool(workers)?;
            self.workers = workers;
        }
        Ok(())
    }
}

fn build_fetch_pool(workers: usize) -> LiveCanvasResult<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("livecanvas-fetch-{i}"))
        .build()
        .map_err(|e| LiveCanvasError::validation(format!("failed to build fetch pool: {e}")))
}

/// Run one fetch, converting errors and panics into [`LiveCanvasError::FetchFailure`].
pub(crate) fn run_fetch(source: &str, fetch: &dyn Fetch) -> FetchOutcome {
    match catch_unwind(AssertUnwindSafe(|| fetch.fetch())) {
        Ok(Ok(data)) => Ok(data),
        Ok(Err(e)) => Err(LiveCanvasError::fetch(source, format!("{e:#}"))),
        Err(panic) => Err(LiveCanvasError::fetch(
            source,
            format!("fetch panicked: {}", panic_message(panic.as_ref())),
        )),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/control/executor.rs"]
mod tests;
