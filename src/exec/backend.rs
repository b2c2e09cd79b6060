// src/exec/backend.rs

//! Pluggable run backend abstraction.
//!
//! The runtime talks to a `RunBackend` instead of the runner directly. This
//! makes it easy to swap in a fake backend in tests while keeping the
//! production implementation in [`RealRunBackend`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::engine::{RuntimeEvent, ScheduledRun};
use crate::errors::Result;
use crate::runner::Runner;

use super::task_runner::run_scheduled;

/// Trait abstracting how scheduled runs are executed.
///
/// Implementations must eventually report every dispatched run back to the
/// runtime as `RuntimeEvent::RunFinished`.
pub trait RunBackend: Send {
    fn dispatch(&mut self, run: ScheduledRun) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: every run becomes its own tokio task, so runs of
/// unrelated tasks execute concurrently.
#[derive(Debug, Clone)]
pub struct RealRunBackend {
    runner: Arc<Runner>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl RealRunBackend {
    pub fn new(runner: Arc<Runner>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self { runner, runtime_tx }
    }
}

impl RunBackend for RealRunBackend {
    fn dispatch(&mut self, run: ScheduledRun) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let runner = Arc::clone(&self.runner);
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            tokio::spawn(run_scheduled(runner, run, tx));
            Ok(())
        })
    }
}
