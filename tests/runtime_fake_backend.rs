// tests/runtime_fake_backend.rs

mod common;
use crate::common::{init_tracing, with_timeout, FakeRunBackend};

use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use assetdag::engine::{
    CoreRuntime, RunOutcome, Runtime, RuntimeEvent, RuntimeOptions, ScheduledRun, TriggerReason,
    TriggerWhileRunningBehaviour,
};
use assetdag::reload::{ReloadHub, ReloadMessage};

type TestResult = Result<(), Box<dyn Error>>;

async fn trigger(tx: &mpsc::Sender<RuntimeEvent>, task: &str) -> TestResult {
    tx.send(RuntimeEvent::TaskTriggered {
        task: task.to_string(),
        reason: TriggerReason::FileWatch,
    })
    .await?;
    Ok(())
}

fn idle_exit_core(behaviour: TriggerWhileRunningBehaviour) -> CoreRuntime {
    CoreRuntime::new(
        behaviour,
        RuntimeOptions {
            exit_when_idle: true,
        },
    )
}

fn tasks_of(dispatched: &Arc<Mutex<Vec<ScheduledRun>>>) -> Vec<(String, TriggerReason)> {
    dispatched
        .lock()
        .unwrap()
        .iter()
        .map(|r| (r.task.clone(), r.reason))
        .collect()
}

#[tokio::test]
async fn triggers_during_a_run_collapse_into_one_rerun() -> TestResult {
    init_tracing();
    let (tx, rx) = mpsc::channel(64);
    let dispatched = Arc::new(Mutex::new(Vec::new()));

    // The fake reports completion through the same channel, so these three
    // triggers are all seen while the first run is in flight.
    for _ in 0..3 {
        trigger(&tx, "less").await?;
    }

    let backend = FakeRunBackend::new(tx.clone(), Arc::clone(&dispatched));
    let runtime = Runtime::new(
        idle_exit_core(TriggerWhileRunningBehaviour::Queue),
        rx,
        backend,
        ReloadHub::new(),
    );
    with_timeout(runtime.run()).await?;

    assert_eq!(
        tasks_of(&dispatched),
        vec![
            ("less".to_string(), TriggerReason::FileWatch),
            ("less".to_string(), TriggerReason::Queued),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn parallel_mode_starts_every_trigger() -> TestResult {
    init_tracing();
    let (tx, rx) = mpsc::channel(64);
    let dispatched = Arc::new(Mutex::new(Vec::new()));

    for _ in 0..3 {
        trigger(&tx, "js").await?;
    }

    let backend = FakeRunBackend::new(tx.clone(), Arc::clone(&dispatched));
    let runtime = Runtime::new(
        idle_exit_core(TriggerWhileRunningBehaviour::Parallel),
        rx,
        backend,
        ReloadHub::new(),
    );
    with_timeout(runtime.run()).await?;

    assert_eq!(dispatched.lock().unwrap().len(), 3);
    let ids: Vec<u64> = dispatched.lock().unwrap().iter().map(|r| r.run_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn only_successful_runs_with_changes_broadcast() -> TestResult {
    init_tracing();
    let (tx, rx) = mpsc::channel(64);
    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let hub = ReloadHub::new();
    let mut reloads = hub.subscribe();

    for task in ["less", "js", "libs"] {
        trigger(&tx, task).await?;
    }

    let backend = FakeRunBackend::new(tx.clone(), Arc::clone(&dispatched))
        .with_outcome("less", RunOutcome::Failed)
        .with_outcome(
            "js",
            RunOutcome::Succeeded {
                changed: vec!["static/app.js".into(), "static/app.js.map".into()],
            },
        );
    let runtime = Runtime::new(
        idle_exit_core(TriggerWhileRunningBehaviour::Queue),
        rx,
        backend,
        hub,
    );
    with_timeout(runtime.run()).await?;

    assert_eq!(dispatched.lock().unwrap().len(), 3);
    assert_eq!(
        reloads.try_recv()?,
        ReloadMessage::Reload {
            paths: vec!["static/app.js".into(), "static/app.js.map".into()]
        }
    );
    assert!(reloads.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn shutdown_stops_the_loop() -> TestResult {
    init_tracing();
    let (tx, rx) = mpsc::channel(64);
    let dispatched = Arc::new(Mutex::new(Vec::new()));

    tx.send(RuntimeEvent::ShutdownRequested).await?;
    trigger(&tx, "less").await?;

    let backend = FakeRunBackend::new(tx.clone(), Arc::clone(&dispatched));
    let runtime = Runtime::new(
        CoreRuntime::new(TriggerWhileRunningBehaviour::Queue, RuntimeOptions::default()),
        rx,
        backend,
        ReloadHub::new(),
    );
    with_timeout(runtime.run()).await?;

    assert!(dispatched.lock().unwrap().is_empty());
    Ok(())
}
