// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! The core consumes [`RuntimeEvent`]s and produces [`CoreCommand`]s for the
//! IO shell (`engine::runtime::Runtime`) to execute. It has no channels, no
//! Tokio types and performs no IO, so its semantics can be unit tested
//! directly.

use std::collections::HashMap;

use crate::engine::event_handlers::{CoreStep, handle_reload_request, handle_run_finished, handle_task_trigger};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions, TaskName};
use crate::types::TriggerWhileRunningBehaviour;

#[derive(Debug)]
pub struct CoreRuntime {
    pub(crate) running: HashMap<TaskName, usize>,
    pub(crate) queue: TriggerQueue,
    pub(crate) next_run_id: u64,
    pub(crate) options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(behaviour: TriggerWhileRunningBehaviour, options: RuntimeOptions) -> Self {
        Self {
            running: HashMap::new(),
            queue: TriggerQueue::new(behaviour),
            next_run_id: 0,
            options,
        }
    }

    /// No run in flight and nothing queued.
    pub fn is_idle(&self) -> bool {
        self.running.is_empty() && self.queue.is_empty()
    }

    /// Number of in-flight runs of `task`.
    pub fn running_count(&self, task: &str) -> usize {
        self.running.get(task).copied().unwrap_or(0)
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task, reason } => handle_task_trigger(self, task, reason),
            RuntimeEvent::ReloadRequested { paths } => handle_reload_request(paths),
            RuntimeEvent::RunFinished { run, outcome } => handle_run_finished(self, run, outcome),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}
