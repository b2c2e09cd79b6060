// src/engine/mod.rs

//! Watch-mode orchestration.
//!
//! Once the initial build is done, the engine reacts to:
//! - file-watch triggers (run a task),
//! - direct reload requests (files that need no rebuild, e.g. templates),
//! - finished runs (broadcast changed outputs, start queued reruns),
//! - shutdown signals.
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::runner::RunReport;

pub use crate::registry::TaskName;

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Triggered due to a filesystem event.
    FileWatch,
    /// Rerun of a task that was triggered while it was running.
    Queued,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Exit once no run is in flight and nothing is queued.
    pub exit_when_idle: bool,
}

/// A run the core wants the backend to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledRun {
    pub task: TaskName,
    /// Monotonically increasing identifier, unique per dispatched run.
    pub run_id: u64,
    pub reason: TriggerReason,
}

/// What a finished run means for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded { changed: Vec<String> },
    Failed,
}

impl RunOutcome {
    pub fn from_report(report: &RunReport) -> Self {
        if report.is_success() {
            RunOutcome::Succeeded {
                changed: report.changed_paths(),
            }
        } else {
            RunOutcome::Failed
        }
    }
}

/// Events flowing into the runtime from the watcher, the backend, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    /// Broadcast a reload for these paths without running anything.
    ReloadRequested { paths: Vec<String> },
    RunFinished {
        run: ScheduledRun,
        outcome: RunOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use crate::types::TriggerWhileRunningBehaviour;
pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use runtime::Runtime;
