// src/exec/task_runner.rs

//! Execution of a single scheduled run.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::engine::{RunOutcome, RuntimeEvent, ScheduledRun};
use crate::runner::Runner;

/// Run `run.task` (with its dependencies) and report a `RunFinished` event.
///
/// Failures are logged here and reported as `RunOutcome::Failed`; they never
/// stop the watch loop.
pub async fn run_scheduled(runner: Arc<Runner>, run: ScheduledRun, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    let started = Instant::now();
    info!(task = %run.task, run_id = run.run_id, reason = ?run.reason, "starting run");

    let outcome = match runner.run(&run.task).await {
        Ok(report) => {
            let outcome = RunOutcome::from_report(&report);
            match report.first_error() {
                None => info!(
                    task = %run.task,
                    run_id = run.run_id,
                    changed = report.changed_paths().len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "run finished"
                ),
                Some((failed, e)) => error!(
                    task = %run.task,
                    run_id = run.run_id,
                    failed_task = %failed,
                    error = %e,
                    "run failed"
                ),
            }
            outcome
        }
        Err(e) => {
            error!(task = %run.task, run_id = run.run_id, error = %e, "run could not start");
            RunOutcome::Failed
        }
    };

    if let Err(e) = runtime_tx.send(RuntimeEvent::RunFinished { run, outcome }).await {
        warn!(error = %e, "runtime channel closed; dropping run result");
    }
}
