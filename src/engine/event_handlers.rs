// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, warn};

use crate::engine::core::CoreRuntime;
use crate::engine::{RunOutcome, ScheduledRun, TaskName, TriggerReason};
use crate::types::TriggerWhileRunningBehaviour;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Start this run on the backend.
    DispatchRun(ScheduledRun),
    /// Send one reload message listing these paths.
    BroadcastReload(Vec<String>),
    /// The process should exit (idle with `exit_when_idle`).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle a task trigger.
///
/// A task that is not running is dispatched right away; runs of different
/// tasks proceed concurrently. A trigger for a running task either queues a
/// single rerun or starts a parallel run, depending on the behaviour.
pub fn handle_task_trigger(core: &mut CoreRuntime, task: TaskName, reason: TriggerReason) -> CoreStep {
    if core.running_count(&task) > 0 {
        match core.queue.behaviour() {
            TriggerWhileRunningBehaviour::Queue => {
                core.queue.record_trigger(&task);
                return CoreStep::continue_with(Vec::new());
            }
            TriggerWhileRunningBehaviour::Parallel => {
                debug!(task = %task, "task already running; starting a parallel run");
            }
        }
    }

    CoreStep::continue_with(vec![dispatch(core, task, reason)])
}

pub fn handle_reload_request(paths: Vec<String>) -> CoreStep {
    if paths.is_empty() {
        return CoreStep::continue_with(Vec::new());
    }
    CoreStep::continue_with(vec![CoreCommand::BroadcastReload(paths)])
}

/// Handle a finished run: broadcast its changes, then start the queued
/// rerun of the same task if there is one.
pub fn handle_run_finished(core: &mut CoreRuntime, run: ScheduledRun, outcome: RunOutcome) -> CoreStep {
    let mut commands = Vec::new();

    match core.running.get_mut(&run.task) {
        Some(count) if *count > 1 => *count -= 1,
        Some(_) => {
            core.running.remove(&run.task);
        }
        None => {
            warn!(task = %run.task, run_id = run.run_id, "finished run was not tracked as running");
        }
    }

    match outcome {
        RunOutcome::Succeeded { changed } if !changed.is_empty() => {
            commands.push(CoreCommand::BroadcastReload(changed));
        }
        RunOutcome::Succeeded { .. } => {
            debug!(task = %run.task, run_id = run.run_id, "run produced no changes; no reload");
        }
        RunOutcome::Failed => {
            debug!(task = %run.task, run_id = run.run_id, "run failed; no reload");
        }
    }

    if core.running_count(&run.task) == 0 && core.queue.take(&run.task) {
        commands.push(dispatch(core, run.task, TriggerReason::Queued));
    }

    let mut keep_running = true;
    if core.options.exit_when_idle && core.is_idle() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}

fn dispatch(core: &mut CoreRuntime, task: TaskName, reason: TriggerReason) -> CoreCommand {
    core.next_run_id += 1;
    *core.running.entry(task.clone()).or_insert(0) += 1;
    debug!(task = %task, run_id = core.next_run_id, ?reason, "dispatching run");
    CoreCommand::DispatchRun(ScheduledRun {
        task,
        run_id: core.next_run_id,
        reason,
    })
}
