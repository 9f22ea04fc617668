use super::*;
use std::time::{Duration, Instant};

fn ok_fetch() -> Arc<dyn Fetch> {
    Arc::new(|| -> anyhow::Result<Dataset> {
        let mut ds = Dataset::new();
        ds.set("r", "v", 1);
        Ok(ds)
    })
}

fn wait(pending: &PendingFetch) -> FetchOutcome {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(outcome) = pending.try_take() {
            return outcome;
        }
        assert!(Instant::now() < deadline, "fetch never completed");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn inline_fetch_is_ready_on_first_poll() {
    let pending = InlineExecutor.dispatch("feed", ok_fetch());
    assert_eq!(pending.source(), "feed");
    let data = pending.try_take().unwrap().unwrap();
    assert_eq!(data.number("r", "v"), Some(1.0));
}

#[test]
fn errors_and_panics_become_fetch_failures() {
    let failing: Arc<dyn Fetch> =
        Arc::new(|| -> anyhow::Result<Dataset> { Err(anyhow::anyhow!("upstream 503")) });
    let err = InlineExecutor
        .dispatch("feed", failing)
        .try_take()
        .unwrap()
        .unwrap_err();
    assert!(err.to_string().contains("upstream 503"));

    let panicking: Arc<dyn Fetch> = Arc::new(|| -> anyhow::Result<Dataset> { panic!("boom") });
    let err = InlineExecutor
        .dispatch("feed", panicking)
        .try_take()
        .unwrap()
        .unwrap_err();
    assert!(matches!(
        err,
        LiveCanvasError::FetchFailure { ref message, .. } if message.contains("boom")
    ));
}

#[test]
fn pool_completes_without_blocking_dispatch() {
    let mut exec = PoolExecutor::new(0).unwrap();
    assert_eq!(exec.workers(), 1);

    let pending = exec.dispatch("feed", ok_fetch());
    let data = wait(&pending).unwrap();
    assert_eq!(data.len(), 1);

    exec.resize(3).unwrap();
    assert_eq!(exec.workers(), 3);
    assert!(wait(&exec.dispatch("feed", ok_fetch())).is_ok());
}

#[test]
fn dropped_sender_reports_failure() {
    let (tx, pending) = PendingFetch::channel("feed");
    assert!(pending.try_take().is_none());
    drop(tx);
    assert!(matches!(
        pending.try_take(),
        Some(Err(LiveCanvasError::FetchFailure { .. }))
    ));
}
