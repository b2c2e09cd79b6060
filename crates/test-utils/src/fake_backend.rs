use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use assetdag::engine::{RunOutcome, RuntimeEvent, ScheduledRun};
use assetdag::errors::Result;
use assetdag::exec::RunBackend;

/// A fake run backend that:
/// - records which runs were dispatched
/// - immediately reports `RunFinished` with a scripted outcome (by default
///   success with no changed outputs).
pub struct FakeRunBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    dispatched: Arc<Mutex<Vec<ScheduledRun>>>,
    outcomes: HashMap<String, RunOutcome>,
}

impl FakeRunBackend {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        dispatched: Arc<Mutex<Vec<ScheduledRun>>>,
    ) -> Self {
        Self {
            runtime_tx,
            dispatched,
            outcomes: HashMap::new(),
        }
    }

    /// Report `outcome` for every run of `task`.
    pub fn with_outcome(mut self, task: &str, outcome: RunOutcome) -> Self {
        self.outcomes.insert(task.to_string(), outcome);
        self
    }
}

impl RunBackend for FakeRunBackend {
    fn dispatch(
        &mut self,
        run: ScheduledRun,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let dispatched = Arc::clone(&self.dispatched);
        let outcome = self
            .outcomes
            .get(&run.task)
            .cloned()
            .unwrap_or(RunOutcome::Succeeded { changed: Vec::new() });

        Box::pin(async move {
            dispatched.lock().unwrap().push(run.clone());

            tx.send(RuntimeEvent::RunFinished { run, outcome })
                .await
                .map_err(anyhow::Error::from)?;
            Ok(())
        })
    }
}
