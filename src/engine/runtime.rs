// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::RunBackend;
use crate::reload::ReloadHub;

use super::core::CoreRuntime;
use super::{CoreCommand, CoreStep, RuntimeEvent};

/// Async IO shell around [`CoreRuntime`].
///
/// Reads `RuntimeEvent`s from the channel, feeds them to the core and
/// executes the resulting commands: runs go to the [`RunBackend`], reloads
/// to the [`ReloadHub`].
pub struct Runtime<B: RunBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    backend: B,
    reload: ReloadHub,
}

impl<B: RunBackend> fmt::Debug for Runtime<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<B: RunBackend> Runtime<B> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, backend: B, reload: ReloadHub) -> Self {
        Self {
            core,
            event_rx,
            backend,
            reload,
        }
    }

    /// Process events until the core stops the loop or every sender is
    /// dropped.
    pub async fn run(mut self) -> Result<()> {
        info!("watch runtime started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "runtime received event");

            let CoreStep {
                commands,
                keep_running,
            } = self.core.step(event);
            for command in commands {
                self.execute_command(command).await?;
            }
            if !keep_running {
                info!("watch runtime stopping");
                return Ok(());
            }
        }

        info!("runtime event channel closed; watch runtime stopping");
        Ok(())
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchRun(run) => {
                debug!(task = %run.task, run_id = run.run_id, "dispatching run to backend");
                self.backend.dispatch(run).await?;
            }
            CoreCommand::BroadcastReload(paths) => {
                let clients = self.reload.notify(paths.clone());
                info!(?paths, clients, "reload broadcast");
            }
            CoreCommand::RequestExit => {
                debug!("idle; exit requested");
            }
        }
        Ok(())
    }
}
