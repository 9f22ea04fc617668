use std::fmt;
use std::sync::Arc;

use crate::data::dataset::Dataset;
use crate::foundation::core::Seconds;

/// A fetch implementation: produces a fresh dataset without runtime context.
///
/// Implementations run on worker threads and own their timeouts. Closures returning
/// `anyhow::Result<Dataset>` implement this trait.
pub trait Fetch: Send + Sync {
    fn fetch(&self) -> anyhow::Result<Dataset>;
}

impl<F> Fetch for F
where
    F: Fn() -> anyhow::Result<Dataset> + Send + Sync,
{
    fn fetch(&self) -> anyhow::Result<Dataset> {
        self()
    }
}

/// Named, periodically refreshed dataset.
///
/// `next_fire` is `None` while a fetch is in flight and for manual sources; the scheduler
/// only dispatches sources whose next fire time has elapsed.
#[derive(Clone)]
pub struct DataSource {
    name: String,
    cooldown: Seconds,
    data: Dataset,
    last_fetch: Option<Seconds>,
    next_fire: Option<Seconds>,
    fetch: Option<Arc<dyn Fetch>>,
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field("name", &self.name)
            .field("cooldown", &self.cooldown)
            .field("rows", &self.data.len())
            .field("last_fetch", &self.last_fetch)
            .field("next_fire", &self.next_fire)
            .field("manual", &self.fetch.is_none())
            .finish()
    }
}

impl DataSource {
    /// Source with a 5 s cooldown that fires as soon as the scheduler sees it.
    pub fn new(name: impl Into<String>, fetch: impl Fetch + 'static) -> Self {
        Self {
            name: name.into(),
            cooldown: 5.0,
            data: Dataset::new(),
            last_fetch: None,
            next_fire: Some(0.0),
            fetch: Some(Arc::new(fetch)),
        }
    }

    /// Source that never fires; its data is installed through the controller.
    pub fn manual(name: impl Into<String>, data: Dataset) -> Self {
        Self {
            name: name.into(),
            cooldown: 5.0,
            data,
            last_fetch: None,
            next_fire: None,
            fetch: None,
        }
    }

    pub fn with_cooldown(mut self, secs: Seconds) -> Self {
        self.cooldown = secs;
        self
    }

    /// First eligible fire time; `None` disables automatic firing.
    pub fn with_next_fire(mut self, at: Option<Seconds>) -> Self {
        self.next_fire = at;
        self
    }

    pub fn with_data(mut self, data: Dataset) -> Self {
        self.data = data;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cooldown(&self) -> Seconds {
        self.cooldown
    }

    pub fn data(&self) -> &Dataset {
        &self.data
    }

    pub fn last_fetch(&self) -> Option<Seconds> {
        self.last_fetch
    }

    pub fn next_fire(&self) -> Option<Seconds> {
        self.next_fire
    }

    pub fn fetcher(&self) -> Option<Arc<dyn Fetch>> {
        self.fetch.clone()
    }

    /// Return `true` when the source may be dispatched at `now`.
    pub fn is_due(&self, now: Seconds) -> bool {
        self.fetch.is_some() && self.next_fire.is_some_and(|at| now >= at)
    }

    /// Install `data` as fetched at `at`.
    pub fn set_data(&mut self, data: Dataset, at: Seconds) {
        self.data = data;
        self.last_fetch = Some(at);
    }

    pub(crate) fn mark_dispatched(&mut self) {
        self.next_fire = None;
    }

    /// Unlock the next fire `max(cooldown, minimum)` after `completed`.
    pub(crate) fn reschedule(&mut self, completed: Seconds, minimum_cooldown: Seconds) {
        self.next_fire = Some(completed + self.cooldown.max(minimum_cooldown));
    }

    pub fn status(&self, now: Seconds) -> SourceStatus {
        SourceStatus {
            name: self.name.clone(),
            age: self.last_fetch.map(|at| (now - at).max(0.0)),
        }
    }
}

/// Freshness of one source.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SourceStatus {
    pub name: String,
    /// Seconds since the last successful fetch, `None` if it never completed one.
    pub age: Option<Seconds>,
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(age) = self.age else {
            return write!(f, "{}: never fetched", self.name);
        };
        let secs = age.floor();
        if secs < 180.0 {
            write!(f, "{}: {secs} seconds ago", self.name)
        } else {
            write!(f, "{}: {:.1} minutes ago", self.name, secs / 60.0)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/data/source.rs"]
mod tests;
